use serde::{Deserialize, Serialize};

/// Label bound to a marker: a bold title line followed by a body line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Popup {
    title: String,
    body: String,
}

impl Popup {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Markup used by HTML front ends: `<b>title</b> <br> body`
    pub fn to_html(&self) -> String {
        format!(
            "<b>{}</b> <br> {}",
            escape_html(&self.title),
            escape_html(&self.body)
        )
    }

    pub fn plain_text(&self) -> String {
        format!("{}\n{}", self.title, self.body)
    }

    /// Draws the popup contents into an egui container
    #[cfg(feature = "egui")]
    pub fn show(&self, ui: &mut egui::Ui) {
        ui.label(egui::RichText::new(&self.title).strong());
        ui.label(&self.body);
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_has_bold_title_and_status() {
        let popup = Popup::new("Grafitti", "resolved");
        assert_eq!(popup.to_html(), "<b>Grafitti</b> <br> resolved");
        assert_eq!(popup.plain_text(), "Grafitti\nresolved");
    }

    #[test]
    fn test_html_escapes_markup() {
        let popup = Popup::new("<script>", "a & b");
        assert_eq!(popup.to_html(), "<b>&lt;script&gt;</b> <br> a &amp; b");
        assert_eq!(popup.title(), "<script>");
    }
}
