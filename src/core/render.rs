use crate::core::content::SiteContent;
use crate::domain::model::ContentSections;
use crate::utils::error::{Result, SiteError};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use minijinja::{Environment, UndefinedBehavior};
use std::path::{Path, PathBuf};

/// Display zone for the "last updated" stamp on the page.
///
/// The zone follows daylight saving; the label is printed as configured.
#[derive(Debug, Clone)]
pub struct DisplayZone {
    pub zone: Tz,
    pub label: String,
}

impl DisplayZone {
    pub fn timestamp(&self, now: DateTime<Utc>) -> String {
        format!(
            "{} {}",
            now.with_timezone(&self.zone).format("%Y-%m-%d %H:%M:%S"),
            self.label
        )
    }

    pub fn year(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.zone).format("%Y").to_string()
    }

    pub fn sections(&self, content: SiteContent, now: DateTime<Utc>) -> ContentSections {
        ContentSections {
            about_text: content.about_text,
            photo_set: content.photo_set,
            recordings: content.recordings,
            resume: content.resume,
            engagements: content.engagements,
            timestamp: self.timestamp(now),
            year: self.year(now),
        }
    }
}

pub struct TemplateRenderer {
    template: PathBuf,
    output: PathBuf,
}

impl TemplateRenderer {
    /// `template` and `output` are full paths (usually under the site root).
    pub fn new(template: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            output: output.into(),
        }
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    fn render_error(&self, message: impl Into<String>) -> SiteError {
        SiteError::TemplateRender {
            template: self.template.display().to_string(),
            message: message.into(),
        }
    }

    pub fn render(&self, sections: &ContentSections) -> Result<String> {
        let dir = self
            .template
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let name = self
            .template
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| self.render_error("template path has no file name"))?;

        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_loader(minijinja::path_loader(dir));

        let template = env
            .get_template(name)
            .map_err(|e| self.render_error(e.to_string()))?;
        template
            .render(sections)
            .map_err(|e| self.render_error(e.to_string()))
    }

    /// 寫入輸出檔；內容未變時不覆寫，保留原本的修改時間
    pub fn write_output(&self, html: &str) -> Result<bool> {
        if let Ok(existing) = std::fs::read_to_string(&self.output) {
            if existing == html {
                tracing::debug!("Page unchanged: {}", self.output.display());
                return Ok(false);
            }
        }

        if let Some(parent) = self.output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SiteError::file(parent, e))?;
        }
        std::fs::write(&self.output, html).map_err(|e| SiteError::file(&self.output, e))?;
        Ok(true)
    }

    pub fn render_to_file(&self, sections: &ContentSections) -> Result<bool> {
        let html = self.render(sections)?;
        let changed = self.write_output(&html)?;
        tracing::info!(
            "📝 Rendered {} ({} bytes{})",
            self.output.display(),
            html.len(),
            if changed { "" } else { ", unchanged" }
        );
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn sections() -> ContentSections {
        ContentSections {
            about_text: "Bio text".to_string(),
            photo_set: vec![
                vec![vec!["a.jpg".into(), "A".into()]],
                vec![],
                vec![],
                vec![],
            ],
            recordings: vec![vec!["A".into(), "2020".into()], vec!["B".into(), "".into()]],
            resume: vec![],
            engagements: vec![],
            timestamp: "2024-01-01 00:00:00 PDT".into(),
            year: "2024".into(),
        }
    }

    fn pacific() -> DisplayZone {
        DisplayZone {
            zone: chrono_tz::US::Pacific,
            label: "PDT".to_string(),
        }
    }

    #[test]
    fn test_display_zone_follows_daylight_saving() {
        let zone = pacific();

        // 冬季 UTC-8
        let winter = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 0).unwrap();
        assert_eq!(zone.timestamp(winter), "2023-12-31 19:00:00 PDT");
        assert_eq!(zone.year(winter), "2023");

        // 夏季 UTC-7
        let summer = Utc.with_ymd_and_hms(2024, 7, 1, 3, 0, 0).unwrap();
        assert_eq!(zone.timestamp(summer), "2024-06-30 20:00:00 PDT");
    }

    #[test]
    fn test_undefined_variable_is_an_error() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("t.html");
        std::fs::write(&template, "{{ about_text }} {{ missing_section }}").unwrap();
        let renderer = TemplateRenderer::new(&template, dir.path().join("index.html"));
        let err = renderer.render(&sections()).unwrap_err();
        assert!(matches!(err, SiteError::TemplateRender { .. }));
    }

    #[test]
    fn test_missing_template_and_syntax_error() {
        let dir = TempDir::new().unwrap();
        let renderer = TemplateRenderer::new(
            dir.path().join("nope.html"),
            dir.path().join("index.html"),
        );
        assert!(matches!(
            renderer.render(&sections()),
            Err(SiteError::TemplateRender { .. })
        ));

        let template = dir.path().join("broken.html");
        std::fs::write(&template, "{% for x in recordings %}never closed").unwrap();
        let renderer = TemplateRenderer::new(&template, dir.path().join("index.html"));
        assert!(renderer.render(&sections()).is_err());
    }

    #[test]
    fn test_photo_rows_unpack_as_pairs() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("t.html");
        std::fs::write(
            &template,
            "{% for path, caption in photo_set[0] %}\n<img src=\"{{ path }}\" alt=\"{{ caption }}\">\n{% endfor %}\n{% for photo in photo_set[0] %}{{ photo[0] }}|{{ photo[1] }}{% endfor %}",
        )
        .unwrap();
        let renderer = TemplateRenderer::new(&template, dir.path().join("index.html"));
        let html = renderer.render(&sections()).unwrap();
        assert_eq!(html, "<img src=\"a.jpg\" alt=\"A\">\na.jpg|A");
    }

    #[test]
    fn test_blank_trailing_cells_render_empty() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("t.html");
        std::fs::write(
            &template,
            "{% for r in recordings %}[{{ r[0] }} {{ r[1] }}]{% endfor %}",
        )
        .unwrap();
        let renderer = TemplateRenderer::new(&template, dir.path().join("index.html"));
        assert_eq!(renderer.render(&sections()).unwrap(), "[A 2020][B ]");
    }

    #[test]
    fn test_unchanged_output_is_not_rewritten() {
        let dir = TempDir::new().unwrap();
        let renderer = TemplateRenderer::new(dir.path().join("t.html"), dir.path().join("out/index.html"));
        assert!(renderer.write_output("<p>hi</p>").unwrap());
        assert!(!renderer.write_output("<p>hi</p>").unwrap());
        assert!(renderer.write_output("<p>bye</p>").unwrap());
        assert_eq!(
            std::fs::read_to_string(dir.path().join("out/index.html")).unwrap(),
            "<p>bye</p>"
        );
    }
}
