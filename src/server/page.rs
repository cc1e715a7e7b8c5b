//! HTML for the index page

use crate::catalog::{Catalog, ImageRecord};

/// Heading used for images stored directly in the mirror root
const ROOT_GROUP_TITLE: &str = "wallpapers";

pub fn render_index(catalog: &Catalog) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>catpaper</title>\n<style>\n\
         body { background: #1e1e2e; color: #cdd6f4; font-family: sans-serif; margin: 2rem; }\n\
         h2 { color: #cba6f7; text-transform: capitalize; }\n\
         .grid { display: flex; flex-wrap: wrap; gap: 0.5rem; }\n\
         .grid img { border-radius: 4px; }\n\
         </style>\n</head>\n<body>\n",
    );

    if catalog.is_empty() {
        html.push_str("<p>No wallpapers found.</p>\n");
    }

    for (group, records) in catalog.iter() {
        let title = if group.is_empty() { ROOT_GROUP_TITLE } else { group };
        html.push_str(&format!("<section>\n<h2>{}</h2>\n<div class=\"grid\">\n", escape(title)));
        for record in records {
            html.push_str(&render_image(record));
        }
        html.push_str("</div>\n</section>\n");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_image(record: &ImageRecord) -> String {
    let href = format!("/wallpaper/{}", url_path(&record.path()));
    format!(
        "<a href=\"{href}\" target=\"_blank\"><img src=\"{href}\" width=\"{}\" height=\"{}\" alt=\"{}\" loading=\"lazy\"></a>\n",
        record.display_width(),
        record.display_height(),
        escape(&record.name),
        href = escape(&href),
    )
}

/// Escape text for use in element content and quoted attributes
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Percent-encode everything outside the unreserved set, keeping `/` separators
pub fn url_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(escape("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_url_path() {
        assert_eq!(url_path("beach/sunset.jpg"), "beach/sunset.jpg");
        assert_eq!(url_path("misc/my cat#1.png"), "misc/my%20cat%231.png");
        assert_eq!(url_path("é.png"), "%C3%A9.png");
    }

    #[test]
    fn test_empty_catalog_page() {
        let html = render_index(&Catalog::new());
        assert!(html.contains("No wallpapers found."));
    }
}
