//! Manifest rendering.
//!
//! Uses Handlebars without HTML escaping (manifests are YAML, not markup).
//! Besides the built-ins (`eq`, `ne`, `and`, `or`, `len`, ...) templates get:
//! - join: Join an array with a separator
//! - lower: Lowercase a string
//! - default: Fall back to a value when the first one is null
//!
//! Records reach the template in the order they were given; nothing here sorts.

use handlebars::{
    no_escape, Context, Handlebars, Helper, HelperDef, HelperResult, Output, RenderContext,
};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tlsprint_core::Target;
use tracing::debug;

use crate::templates::{ManifestSchema, ManifestTemplate};
use crate::RenderError;

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Join an array with a separator; anything else joins to ""
struct JoinHelper;

impl HelperDef for JoinHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let separator = h
            .param(1)
            .and_then(|v| v.value().as_str())
            .unwrap_or(", ");

        if let Some(items) = h.param(0).and_then(|v| v.value().as_array()) {
            let joined: Vec<String> = items.iter().map(display).collect();
            out.write(&joined.join(separator))?;
        }
        Ok(())
    }
}

struct LowerHelper;

impl HelperDef for LowerHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        if let Some(value) = h.param(0) {
            out.write(&display(value.value()).to_lowercase())?;
        }
        Ok(())
    }
}

/// First parameter unless it is null, else the second
struct DefaultHelper;

impl HelperDef for DefaultHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _r: &'reg Handlebars<'reg>,
        _ctx: &'rc Context,
        _rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = h
            .param(0)
            .map(|v| v.value())
            .filter(|v| !v.is_null())
            .or_else(|| h.param(1).map(|v| v.value()));
        if let Some(value) = value {
            out.write(&display(value))?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ManifestRecord<'a> {
    implementation: &'a str,
    version: &'a str,
    protocol: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    protocols: Option<Vec<&'a str>>,
}

#[derive(Debug, Serialize)]
struct ManifestContext<'a> {
    schema: &'static str,
    total: usize,
    targets: Vec<ManifestRecord<'a>>,
}

/// Rendered manifest text and its content digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedManifest {
    pub text: String,
    /// `blake3:<hex>` of `text`
    pub digest: String,
}

impl RenderedManifest {
    fn new(text: String) -> Self {
        let digest = format!("blake3:{}", blake3::hash(text.as_bytes()));
        Self { text, digest }
    }

    pub fn write_to(&self, path: &Path) -> Result<(), RenderError> {
        std::fs::write(path, &self.text)
            .map_err(|e| RenderError::Write(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), digest = %self.digest, "manifest written");
        Ok(())
    }
}

/// Compiled manifest template with registered helpers
pub struct ManifestRenderer<'a> {
    handlebars: Handlebars<'a>,
    template_name: String,
    schema: ManifestSchema,
}

impl<'a> ManifestRenderer<'a> {
    pub fn new(template: &ManifestTemplate, schema: ManifestSchema) -> Result<Self, RenderError> {
        let mut handlebars = Handlebars::new();

        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(no_escape);

        handlebars.register_helper("join", Box::new(JoinHelper));
        handlebars.register_helper("lower", Box::new(LowerHelper));
        handlebars.register_helper("default", Box::new(DefaultHelper));

        handlebars
            .register_template_string(&template.name, &template.source)
            .map_err(|e| RenderError::Template(format!("{}: {}", template.name, e)))?;

        Ok(ManifestRenderer {
            handlebars,
            template_name: template.name.clone(),
            schema,
        })
    }

    /// Load from a file path
    pub fn load(path: &Path, schema: ManifestSchema) -> Result<Self, RenderError> {
        Self::new(&ManifestTemplate::load(path)?, schema)
    }

    pub fn schema(&self) -> ManifestSchema {
        self.schema
    }

    /// Render the targets, in the order given
    pub fn render(&self, targets: &[Target]) -> Result<RenderedManifest, RenderError> {
        let context = ManifestContext {
            schema: self.schema.as_str(),
            total: targets.len(),
            targets: targets.iter().map(|t| self.record(t)).collect(),
        };
        let data = serde_json::to_value(&context)
            .map_err(|e| RenderError::Render(format!("context: {}", e)))?;
        self.render_value(&data)
    }

    /// Render an arbitrary context, bypassing the record layout
    pub fn render_value(&self, data: &Value) -> Result<RenderedManifest, RenderError> {
        let text = self
            .handlebars
            .render(&self.template_name, data)
            .map_err(|e| RenderError::Render(e.to_string()))?;
        Ok(RenderedManifest::new(text))
    }

    fn record<'t>(&self, target: &'t Target) -> ManifestRecord<'t> {
        ManifestRecord {
            implementation: target.implementation.as_str(),
            version: target.version.as_str(),
            protocol: target.protocol.as_str(),
            protocols: match self.schema {
                ManifestSchema::V1 => None,
                ManifestSchema::V2 => Some(target.capabilities.iter().map(|p| p.as_str()).collect()),
            },
        }
    }
}
