// PDF template renderer backed by lopdf
//
// Loads the single-page template, registers the two Times faces on the first
// page, and appends an overlay content stream with the recipient's lines.

use std::path::Path;
use std::sync::Arc;

use chrono::FixedOffset;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use super::layout::{overlay_content, CertificateLayout};
use super::metrics::FontFace;
use super::text::CertificateLines;
use crate::error::RenderError;
use crate::traits::{CertificateRenderer, CertificateText};

// Bound on Parent hops when resolving inherited page attributes
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Renders certificates onto a fixed PDF template
#[derive(Clone)]
pub struct PdfTemplateRenderer {
    template: Arc<Vec<u8>>,
    layout: CertificateLayout,
    offset: FixedOffset,
}

impl PdfTemplateRenderer {
    pub fn new(template: Vec<u8>, offset: FixedOffset) -> Self {
        Self {
            template: Arc::new(template),
            layout: CertificateLayout::default(),
            offset,
        }
    }

    /// Read the template from disk
    pub fn from_path(path: impl AsRef<Path>, offset: FixedOffset) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let template = std::fs::read(path)
            .map_err(|e| RenderError::Template(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), bytes = template.len(), "Loaded certificate template");
        Ok(Self::new(template, offset))
    }

    pub fn with_layout(mut self, layout: CertificateLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Parse the template once and return the width of its first page
    pub fn validate(&self) -> Result<f32, RenderError> {
        let doc = load(&self.template)?;
        let page_id = first_page(&doc)?;
        page_width(&doc, page_id)
    }
}

impl CertificateRenderer for PdfTemplateRenderer {
    fn render(&self, text: &CertificateText) -> Result<Vec<u8>, RenderError> {
        let lines = CertificateLines::compose(text, self.offset);
        render_on_template(&self.template, &self.layout, &lines)
    }
}

/// Overlay `lines` on the first page of `template` and serialize the result
pub fn render_on_template(
    template: &[u8],
    layout: &CertificateLayout,
    lines: &CertificateLines,
) -> Result<Vec<u8>, RenderError> {
    let mut doc = load(template)?;
    let page_id = first_page(&doc)?;
    let width = page_width(&doc, page_id)?;

    let fonts = [FontFace::Bold, FontFace::Regular].map(|face| {
        let id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => face.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        (face.resource_name(), id)
    });
    install_fonts(&mut doc, page_id, &fonts)?;

    let placed = layout.place(width, lines);
    append_overlay(&mut doc, page_id, overlay_content(&placed))?;

    let mut out = Vec::with_capacity(template.len() + 2048);
    doc.save_to(&mut out)
        .map_err(|e| RenderError::Serialize(e.to_string()))?;
    debug!(bytes = out.len(), page_width = width, "Rendered certificate");
    Ok(out)
}

fn load(template: &[u8]) -> Result<Document, RenderError> {
    Document::load_mem(template).map_err(|e| RenderError::Template(e.to_string()))
}

fn first_page(doc: &Document) -> Result<ObjectId, RenderError> {
    doc.get_pages()
        .values()
        .next()
        .copied()
        .ok_or(RenderError::EmptyTemplate)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        other => other,
    }
}

/// Look up a page attribute, following the Parent chain for inherited ones
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn page_width(doc: &Document, page_id: ObjectId) -> Result<f32, RenderError> {
    let media_box = inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .ok_or_else(|| RenderError::Template("first page has no MediaBox".to_string()))?;

    let coords: Vec<f32> = media_box
        .iter()
        .filter_map(|o| number(resolve(doc, o)))
        .collect();
    match coords.as_slice() {
        [x1, _, x2, _] if x2 > x1 => Ok(x2 - x1),
        _ => Err(RenderError::Template(format!(
            "invalid MediaBox: {media_box:?}"
        ))),
    }
}

/// Register fonts on the page, merging into (never replacing) its resources
fn install_fonts(
    doc: &mut Document,
    page_id: ObjectId,
    fonts: &[(&str, ObjectId)],
) -> Result<(), RenderError> {
    let mut resources = match inherited(doc, page_id, b"Resources") {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };
    let mut font_dict = match resources.get(b"Font").map(|obj| resolve(doc, obj)) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };

    for (name, id) in fonts {
        font_dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    resources.set("Font", Object::Dictionary(font_dict));

    doc.get_object_mut(page_id)
        .and_then(|page| page.as_dict_mut())
        .map_err(|e| RenderError::Font(e.to_string()))?
        .set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Wrap the template content in q/Q and append the overlay after it
fn append_overlay(
    doc: &mut Document,
    page_id: ObjectId,
    overlay: Vec<u8>,
) -> Result<(), RenderError> {
    let existing: Vec<Object> = {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| RenderError::Template(e.to_string()))?;
        match page.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(reference @ Object::Reference(_)) => match resolve(doc, reference) {
                Object::Array(items) => items.clone(),
                _ => vec![reference.clone()],
            },
            _ => vec![],
        }
    };

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing);
    contents.push(Object::Reference(overlay_id));

    doc.get_object_mut(page_id)
        .and_then(|page| page.as_dict_mut())
        .map_err(|e| RenderError::Template(e.to_string()))?
        .set("Contents", Object::Array(contents));
    Ok(())
}
