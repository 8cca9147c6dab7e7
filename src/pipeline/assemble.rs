//! Page assembler: OCR pages → one Markdown document with images inline.
//!
//! OCR Markdown refers to each cropped image as `![id](id)`. The assembler
//! substitutes the image payload for the link target, page by page, so that
//! identical ids on different pages resolve to their own page's image. Pages
//! are then joined with the configured separator.

use crate::config::{PageSelection, PageSeparator};
use crate::pipeline::ocr::OcrPage;
use tracing::debug;

/// Inline one page's image payloads into its Markdown.
///
/// Exactly `![id](id)` is rewritten to `![id](payload)`; images without a
/// payload are left as they are.
pub fn inline_images(page: &OcrPage) -> String {
    page.images
        .iter()
        .filter_map(|img| img.image_base64.as_deref().map(|payload| (&img.id, payload)))
        .fold(page.markdown.clone(), |md, (id, payload)| {
            md.replace(&format!("![{id}]({id})"), &format!("![{id}]({payload})"))
        })
}

/// Combine the selected pages into a single document.
///
/// Zero selected pages yield an empty document.
pub fn assemble_pages(
    pages: &[OcrPage],
    selection: &PageSelection,
    separator: &PageSeparator,
) -> String {
    let indices = selection.to_indices(pages.len());
    debug!("Assembling {} of {} pages", indices.len(), pages.len());

    let mut out = String::new();
    for (i, &idx) in indices.iter().enumerate() {
        if i > 0 {
            out.push_str(&separator.render(idx + 1));
        }
        out.push_str(&inline_images(&pages[idx]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ocr::OcrImage;

    fn page(index: usize, markdown: &str, images: &[(&str, Option<&str>)]) -> OcrPage {
        OcrPage {
            index,
            markdown: markdown.to_string(),
            images: images
                .iter()
                .map(|(id, b64)| OcrImage {
                    id: id.to_string(),
                    image_base64: b64.map(str::to_string),
                })
                .collect(),
        }
    }

    #[test]
    fn pages_joined_with_blank_line() {
        let pages = [page(0, "# T", &[]), page(1, "Body", &[])];
        assert_eq!(
            assemble_pages(&pages, &PageSelection::All, &PageSeparator::None),
            "# T\n\nBody"
        );
    }

    #[test]
    fn images_inlined_per_page() {
        let pages = [
            page(0, "![img-0.jpeg](img-0.jpeg)", &[("img-0.jpeg", Some("data:A"))]),
            page(1, "![img-0.jpeg](img-0.jpeg)", &[("img-0.jpeg", Some("data:B"))]),
        ];
        assert_eq!(
            assemble_pages(&pages, &PageSelection::All, &PageSeparator::None),
            "![img-0.jpeg](data:A)\n\n![img-0.jpeg](data:B)"
        );
    }

    #[test]
    fn missing_payload_left_untouched() {
        let p = page(0, "![x](x)", &[("x", None)]);
        assert_eq!(inline_images(&p), "![x](x)");
    }

    #[test]
    fn only_exact_markup_is_rewritten() {
        let p = page(0, "![caption](x) and ![x](x)", &[("x", Some("data:Z"))]);
        assert_eq!(inline_images(&p), "![caption](x) and ![x](data:Z)");
    }

    #[test]
    fn selection_and_separator() {
        let pages = [page(0, "a", &[]), page(1, "b", &[]), page(2, "c", &[])];
        assert_eq!(
            assemble_pages(&pages, &PageSelection::Set(vec![1, 3]), &PageSeparator::Comment),
            "a\n\n<!-- page 3 -->\n\nc"
        );
        assert_eq!(
            assemble_pages(&pages, &PageSelection::Range(2, 3), &PageSeparator::HorizontalRule),
            "b\n\n---\n\nc"
        );
    }

    #[test]
    fn no_pages_is_empty() {
        assert_eq!(assemble_pages(&[], &PageSelection::All, &PageSeparator::None), "");
    }
}
