//! Page templates, registered once at start-up and shared by all handlers.

use handlebars::Handlebars;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to register template: {0}")]
    Register(#[from] handlebars::TemplateError),
    #[error("failed to render template: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// The pages of the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Login,
    Registration,
    Upload,
    Files,
    Categories,
    Users,
    Download,
}

impl Page {
    pub const ALL: [Page; 7] = [
        Page::Login,
        Page::Registration,
        Page::Upload,
        Page::Files,
        Page::Categories,
        Page::Users,
        Page::Download,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Page::Login => "login",
            Page::Registration => "registration",
            Page::Upload => "upload",
            Page::Files => "files",
            Page::Categories => "categories",
            Page::Users => "users",
            Page::Download => "download",
        }
    }

    fn embedded(self) -> &'static str {
        match self {
            Page::Login => include_str!("../templates/login.hbs"),
            Page::Registration => include_str!("../templates/registration.hbs"),
            Page::Upload => include_str!("../templates/upload.hbs"),
            Page::Files => include_str!("../templates/files.hbs"),
            Page::Categories => include_str!("../templates/categories.hbs"),
            Page::Users => include_str!("../templates/users.hbs"),
            Page::Download => include_str!("../templates/download.hbs"),
        }
    }
}

const MENU: &str = include_str!("../templates/menu.hbs");

#[derive(Debug)]
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    /// The templates compiled into the binary.
    pub fn embedded() -> Result<Self, TemplateError> {
        Self::load(None)
    }

    /// The built-in templates, each replaced by `{dir}/{name}.hbs` if that file exists.
    pub fn load(dir: Option<&Path>) -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.register_partial("menu", MENU)?;
        for page in Page::ALL {
            let name = page.name();
            match dir.map(|dir| dir.join(format!("{name}.hbs"))) {
                Some(path) if path.is_file() => {
                    log::info!("Using template {}", path.display());
                    registry.register_template_file(name, &path)?;
                }
                _ => registry.register_template_string(name, page.embedded())?,
            }
        }
        Ok(Self { registry })
    }

    pub fn render<T: Serialize>(&self, page: Page, data: &T) -> Result<String, TemplateError> {
        Ok(self.registry.render(page.name(), data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_warning_is_red() {
        let templates = Templates::embedded().unwrap();
        let page = templates
            .render(
                Page::Login,
                &json!({ "warning": "Wrong username or password", "username": "example" }),
            )
            .unwrap();
        assert!(page.contains(r#"<h2 style="color:red">Wrong username or password</h2>"#));
        assert!(page.contains(r#"value="example""#));
    }

    #[test]
    fn menu_is_included() {
        let templates = Templates::embedded().unwrap();
        let page = templates
            .render(Page::Categories, &json!({ "username": "example", "categories": ["music"] }))
            .unwrap();
        assert!(page.contains("Logout (example)"));
        assert!(page.contains(r#"<a href="/categories/music">music</a>"#));
    }
}
