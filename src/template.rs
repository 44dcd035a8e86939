use crate::error::{AutocapError, AutocapResult};
use crate::overlay::CaptionStyle;
use handlebars::Handlebars;
use serde_json::json;
use std::path::Path;
use tracing::{debug, trace};

const CAPTION_TEMPLATE: &str = include_str!("templates/caption.html");
const TEMPLATE_NAME: &str = "caption";

/// Handlebars template that lays out one caption line as HTML.
///
/// The template must contain an element with id `caption` wrapping the text;
/// its bounding box becomes the rasterized bitmap.
pub struct CaptionTemplate<'a> {
    hbs: Handlebars<'a>,
}

impl<'a> CaptionTemplate<'a> {
    pub fn new() -> AutocapResult<Self> {
        let mut hbs = Handlebars::new();
        hbs.set_strict_mode(false);
        hbs.register_template_string(TEMPLATE_NAME, CAPTION_TEMPLATE)
            .map_err(|e| AutocapError::Rasterization(format!("Built-in caption template: {e}")))?;
        Ok(Self { hbs })
    }

    /// Replace the built-in template with a user-supplied HTML file.
    pub fn register_override(&mut self, path: &Path) -> AutocapResult<()> {
        debug!("Registering caption template override: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            AutocapError::Rasterization(format!("Cannot read template {}: {e}", path.display()))
        })?;
        self.hbs
            .register_template_string(TEMPLATE_NAME, &content)
            .map_err(|e| {
                AutocapError::Rasterization(format!(
                    "Failed to register template {}: {e}",
                    path.display()
                ))
            })
    }

    /// Render the HTML document for `text` in `style`. Text is HTML-escaped.
    pub fn render_html(&self, text: &str, style: &CaptionStyle) -> AutocapResult<String> {
        trace!("Rendering caption HTML for \"{text}\"");
        let data = json!({
            "text": text,
            "font": &style.font,
            "size": style.size,
            "color": style.text_color.to_css(),
        });
        self.hbs
            .render(TEMPLATE_NAME, &data)
            .map_err(|e| AutocapError::Rasterization(format!("Caption template render failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::Rgb;

    fn style() -> CaptionStyle {
        CaptionStyle {
            font: "Amiri".into(),
            size: 34,
            text_color: Rgb(255, 255, 255),
            background_color: Rgb(0, 0, 0),
            background_opacity: 0.0,
            padding: 6,
            clamp_to_frame: false,
        }
    }

    #[test]
    fn test_render_builtin() {
        let template = CaptionTemplate::new().unwrap();
        let html = template.render_html("Hello World", &style()).unwrap();
        assert!(html.contains(r#"<span id="caption">Hello World</span>"#));
        assert!(html.contains("font-size: 34px"));
        assert!(html.contains("\"Amiri\""));
        assert!(html.contains("color: #ffffff"));
    }

    #[test]
    fn test_text_is_escaped() {
        let template = CaptionTemplate::new().unwrap();
        let html = template.render_html("<b>loud</b> & clear", &style()).unwrap();
        assert!(!html.contains("<b>loud</b>"));
        assert!(html.contains("&lt;b&gt;loud&lt;/b&gt; &amp; clear"));
    }

    #[test]
    fn test_override_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("caption.html");
        std::fs::write(&path, r#"<div id="caption" style="color:{{color}}">{{text}}</div>"#).unwrap();

        let mut template = CaptionTemplate::new().unwrap();
        template.register_override(&path).unwrap();
        let html = template.render_html("hi", &style()).unwrap();
        assert_eq!(html, r#"<div id="caption" style="color:#ffffff">hi</div>"#);
    }

    #[test]
    fn test_override_missing_file() {
        let mut template = CaptionTemplate::new().unwrap();
        let err = template
            .register_override(Path::new("/nonexistent/caption.html"))
            .unwrap_err();
        assert!(matches!(err, AutocapError::Rasterization(_)));
    }
}
