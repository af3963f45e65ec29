// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF document wrapper: open, inspect, extract text, import pages between
// documents, and append page content using the `lopdf` crate.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId, Stream, dictionary};
use pdfsplit_core::error::{Result, SplitError};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::page::{DEFAULT_MEDIA_BOX, PageBox, PdfPage};

/// Page attributes that may be inherited from an ancestor /Pages node.
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic /Parent chains and reference loops.
const MAX_TREE_DEPTH: usize = 64;

/// Resource name of the invisible text layer font.
pub const OVERLAY_FONT_NAME: &str = "PdfSplitOcrFont";

/// An in-memory PDF document.
///
/// Wraps `lopdf::Document` and adds what splitting needs on top: 0-based page
/// handles, single page text extraction, page import with reference
/// remapping, and a lock that serialises page rendering.
pub struct PdfDocument {
    inner: Document,
    /// Identity of this document, used to key imported object ids.
    id: Uuid,
    /// Bumped on every modification so cached renderings can be invalidated.
    revision: u64,
    source_path: Option<PathBuf>,
    render_lock: Mutex<()>,
    /// Page object ids in page tree order, rebuilt after modifications.
    page_ids: OnceLock<Vec<ObjectId>>,
    /// (source document, source object) -> object id in this document.
    imported: HashMap<(Uuid, ObjectId), ObjectId>,
    overlay_font: Option<ObjectId>,
}

impl std::fmt::Debug for PdfDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfDocument")
            .field("id", &self.id)
            .field("revision", &self.revision)
            .field("version", &self.inner.version)
            .field("pages", &self.page_count())
            .field("source_path", &self.source_path)
            .finish()
    }
}

impl PdfDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            SplitError::Pdf(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        let mut doc = Self::from_lopdf(document);
        doc.source_path = Some(path_ref.to_path_buf());
        Ok(doc)
    }

    /// Load a PDF from raw bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            SplitError::Pdf(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self::from_lopdf(document))
    }

    /// Wrap an existing `lopdf` document.
    pub fn from_lopdf(document: Document) -> Self {
        Self {
            inner: document,
            id: Uuid::new_v4(),
            revision: 0,
            source_path: None,
            render_lock: Mutex::new(()),
            page_ids: OnceLock::new(),
            imported: HashMap::new(),
            overlay_font: None,
        }
    }

    /// Create an empty document with a catalog and an empty page tree.
    pub fn new_empty(version: &str) -> Self {
        let mut document = Document::with_version(version);

        let pages_id = document.new_object_id();
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => Object::Array(Vec::new()),
                "Count" => Object::Integer(0),
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        document.trailer.set("Root", Object::Reference(catalog_id));

        Self::from_lopdf(document)
    }

    /// Create an empty document carrying the version, document information
    /// and viewer preferences of `source`.
    pub fn new_like(source: &PdfDocument) -> Self {
        let mut target = Self::new_empty(source.version());
        target.copy_document_attributes(source);
        target
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_ids().len()
    }

    /// All pages in page tree order.
    pub fn pages(&self) -> Vec<PdfPage> {
        self.page_ids()
            .iter()
            .enumerate()
            .map(|(index, object_id)| self.make_page(index, *object_id))
            .collect()
    }

    /// The page at a 0-based index.
    pub fn page(&self, index: usize) -> Result<PdfPage> {
        let object_id = self.page_id(index)?;
        Ok(self.make_page(index, object_id))
    }

    pub fn version(&self) -> &str {
        &self.inner.version
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Modification counter, starting at 0.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Path the document was opened from or last saved to.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Value of an /Info entry as text, if present.
    pub fn info_value(&self, key: &str) -> Option<String> {
        let info = match self.inner.trailer.get(b"Info") {
            Ok(object) => self.resolve(object),
            Err(_) => return None,
        };
        match info {
            Object::Dictionary(dict) => match dict.get(key.as_bytes()).map(|v| self.resolve(v)) {
                Ok(Object::String(bytes, _)) => Some(String::from_utf8_lossy(bytes).into_owned()),
                Ok(Object::Name(name)) => Some(String::from_utf8_lossy(name).into_owned()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Borrow the underlying `lopdf` document.
    pub fn as_lopdf(&self) -> &Document {
        &self.inner
    }

    /// Mutably borrow the underlying `lopdf` document.
    pub fn as_lopdf_mut(&mut self) -> &mut Document {
        self.touch();
        &mut self.inner
    }

    pub fn into_lopdf(self) -> Document {
        self.inner
    }

    // -- Text -----------------------------------------------------------------

    /// Extract the plain text of pages `first..=last` (1-indexed, as in the
    /// PDF page labels of most viewers).
    pub fn extract_text(&self, first: u32, last: u32) -> Result<String> {
        if first == 0 || last < first {
            return Err(SplitError::Pdf(format!(
                "invalid text extraction range {}..={}",
                first, last
            )));
        }
        let mut text = String::new();
        for number in first..=last {
            text.push_str(&self.page_text(number as usize - 1)?);
        }
        Ok(text)
    }

    /// Plain text of the page at a 0-based index.
    pub fn page_text(&self, index: usize) -> Result<String> {
        let page_id = self.page_id(index)?;
        self.text_of_page(page_id).map_err(|err| {
            SplitError::Pdf(format!("text extraction failed for page {}: {}", index, err))
        })
    }

    /// Whether the page carries extractable, non-blank text. Extraction
    /// failures count as no text.
    pub fn page_has_text(&self, index: usize) -> bool {
        match self.page_text(index) {
            Ok(text) => !text.trim().is_empty(),
            Err(err) => {
                debug!(page_index = index, %err, "Text extraction failed, assuming no text");
                false
            }
        }
    }

    // -- Rendering support ----------------------------------------------------

    /// Serialise access to page rendering for this document.
    pub fn render_lock(&self) -> MutexGuard<'_, ()> {
        self.render_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Serialise a copy of the document without modifying it.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>> {
        let mut copy = self.inner.clone();
        let mut output = Vec::new();
        copy.save_to(&mut output).map_err(|err| {
            SplitError::Pdf(format!("failed to serialise document snapshot: {}", err))
        })?;
        Ok(output)
    }

    // -- Building documents ---------------------------------------------------

    /// Copy version, document information and viewer preferences from
    /// `source`.
    ///
    /// Nested dictionaries in /Info are skipped (with a warning), as is the
    /// /Type entry.
    pub fn copy_document_attributes(&mut self, source: &PdfDocument) {
        self.inner.version = source.inner.version.clone();

        if let Ok(info_object) = source.inner.trailer.get(b"Info") {
            if let Object::Dictionary(info) = source.resolve(info_object) {
                let mut copied = Dictionary::new();
                for (key, value) in info.iter() {
                    if key == b"Type" {
                        continue;
                    }
                    match source.resolve(value) {
                        Object::Dictionary(_) | Object::Stream(_) => {
                            warn!(
                                key = %String::from_utf8_lossy(key),
                                "Skipping nested dictionary in document information"
                            );
                        }
                        Object::Array(items) => {
                            let cloned = self.import_object(source, &Object::Array(items.clone()));
                            copied.set(key.clone(), cloned);
                        }
                        other => copied.set(key.clone(), other.clone()),
                    }
                }
                let info_id = self.inner.add_object(Object::Dictionary(copied));
                self.inner.trailer.set("Info", Object::Reference(info_id));
            }
        }

        let preferences = source
            .inner
            .catalog()
            .ok()
            .and_then(|catalog| catalog.get(b"ViewerPreferences").ok())
            .cloned();
        if let Some(preferences) = preferences {
            let cloned = self.import_object(source, &preferences);
            match self.catalog_id().and_then(|id| {
                self.inner
                    .get_dictionary_mut(id)
                    .map_err(|err| SplitError::Pdf(format!("no catalog: {}", err)))
            }) {
                Ok(catalog) => catalog.set("ViewerPreferences", cloned),
                Err(err) => warn!(%err, "Cannot copy viewer preferences"),
            }
        }
        self.touch();
    }

    /// Append a page of `source` to the end of this document.
    ///
    /// Objects referenced by the page are copied once per source document and
    /// shared by all pages imported from it. Inherited attributes are set on
    /// the copied page directly. References to pages (annotation /P, link
    /// destinations) are replaced by null because the target pages may not
    /// exist in this document.
    #[instrument(skip_all, fields(page_index = page.index))]
    pub fn import_page(&mut self, source: &PdfDocument, page: &PdfPage) -> Result<PdfPage> {
        let source_page = source.inner.get_dictionary(page.object_id).map_err(|err| {
            SplitError::Pdf(format!(
                "cannot read page object {:?}: {}",
                page.object_id, err
            ))
        })?;

        let mut page_dict = Dictionary::new();
        for (key, value) in source_page.iter() {
            // The target page tree node is set below.
            if key == b"Parent" {
                continue;
            }
            let cloned = self.import_object(source, value);
            page_dict.set(key.clone(), cloned);
        }

        for key in INHERITABLE_ATTRIBUTES {
            if page_dict.has(key) {
                continue;
            }
            if let Some(value) = source.inherited_attribute(page.object_id, key) {
                let cloned = self.import_object(source, &value);
                page_dict.set(key.to_vec(), cloned);
            }
        }

        let pages_id = self.pages_root_id()?;
        page_dict.set("Parent", Object::Reference(pages_id));
        let new_page_id = self.inner.add_object(Object::Dictionary(page_dict));

        let pages = self
            .inner
            .get_dictionary_mut(pages_id)
            .map_err(|err| SplitError::Pdf(format!("no /Pages node: {}", err)))?;
        let mut kids = match pages.get(b"Kids") {
            Ok(Object::Array(kids)) => kids.clone(),
            _ => Vec::new(),
        };
        kids.push(Object::Reference(new_page_id));
        let count = match pages.get(b"Count") {
            Ok(Object::Integer(count)) => *count,
            _ => 0,
        };
        pages.set("Kids", Object::Array(kids));
        pages.set("Count", Object::Integer(count + 1));

        self.touch();
        let index = self.page_count() - 1;
        debug!(target_index = index, "Page imported");
        Ok(self.make_page(index, new_page_id))
    }

    /// Append a content stream to a page.
    ///
    /// The existing content is wrapped in `q`/`Q` so that `content` starts
    /// from the default graphics state.
    pub fn append_page_content(&mut self, page: &PdfPage, content: Vec<u8>) -> Result<()> {
        let existing = {
            let page_dict = self.page_dictionary(page.object_id)?;
            match page_dict.get(b"Contents") {
                Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
                Ok(Object::Array(items)) => items.clone(),
                Ok(Object::Stream(stream)) => vec![Object::Stream(stream.clone())],
                _ => Vec::new(),
            }
        };
        // Direct streams are not valid in /Contents arrays; move them out.
        let existing: Vec<Object> = existing
            .into_iter()
            .map(|item| match item {
                Object::Stream(stream) => Object::Reference(self.inner.add_object(stream)),
                other => other,
            })
            .collect();

        let mut contents = Vec::with_capacity(existing.len() + 2);
        if !existing.is_empty() {
            let save_id = self
                .inner
                .add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            contents.push(Object::Reference(save_id));
            contents.extend(existing);
        }

        let mut overlay = Vec::with_capacity(content.len() + 3);
        if !contents.is_empty() {
            // Streams are joined without a separator when read back.
            overlay.extend_from_slice(b"\nQ\n");
        }
        overlay.extend_from_slice(&content);
        let overlay_id = self.inner.add_object(Stream::new(Dictionary::new(), overlay));
        contents.push(Object::Reference(overlay_id));

        let page_dict = self
            .inner
            .get_dictionary_mut(page.object_id)
            .map_err(|err| SplitError::Pdf(format!("cannot modify page: {}", err)))?;
        page_dict.set("Contents", Object::Array(contents));
        self.touch();
        Ok(())
    }

    /// Object id of the invisible text layer font, creating it on first use.
    ///
    /// Standard 14 Helvetica with WinAnsiEncoding, so no font program needs to
    /// be embedded.
    pub fn ensure_overlay_font(&mut self) -> ObjectId {
        if let Some(id) = self.overlay_font {
            return id;
        }
        let id = self.inner.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        self.overlay_font = Some(id);
        self.touch();
        id
    }

    /// Register `font_id` under `name` in the font resources of a page.
    ///
    /// Inherited resources are copied onto the page first so that other pages
    /// sharing the same ancestor are not affected.
    pub fn add_page_font(&mut self, page: &PdfPage, name: &str, font_id: ObjectId) -> Result<()> {
        let has_own_resources = self.page_dictionary(page.object_id)?.has(b"Resources");
        if !has_own_resources {
            let inherited = self
                .inherited_attribute(page.object_id, b"Resources")
                .map(|object| self.resolve(&object).clone());
            let resources = match inherited {
                Some(Object::Dictionary(dict)) => dict,
                _ => Dictionary::new(),
            };
            self.inner
                .get_dictionary_mut(page.object_id)
                .map_err(|err| SplitError::Pdf(format!("cannot modify page: {}", err)))?
                .set("Resources", Object::Dictionary(resources));
        }

        let font_reference = match self.page_resources_mut(page.object_id)?.get(b"Font") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };

        match font_reference {
            Some(fonts_id) => {
                self.inner
                    .get_dictionary_mut(fonts_id)
                    .map_err(|err| SplitError::Pdf(format!("bad /Font resource: {}", err)))?
                    .set(name.as_bytes().to_vec(), Object::Reference(font_id));
            }
            None => {
                let resources = self.page_resources_mut(page.object_id)?;
                if let Ok(Object::Dictionary(fonts)) = resources.get_mut(b"Font") {
                    fonts.set(name.as_bytes().to_vec(), Object::Reference(font_id));
                } else {
                    let mut fonts = Dictionary::new();
                    fonts.set(name.as_bytes().to_vec(), Object::Reference(font_id));
                    resources.set("Font", Object::Dictionary(fonts));
                }
            }
        }
        self.touch();
        Ok(())
    }

    // -- Persistence ----------------------------------------------------------

    /// Write the document to `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path_ref = path.as_ref();
        let mut file = std::fs::File::create(path_ref)?;
        self.save_to(&mut file)?;
        file.flush()?;
        self.source_path = Some(path_ref.to_path_buf());
        info!(pages = self.page_count(), "PDF saved");
        Ok(())
    }

    /// Write the document to an arbitrary writer.
    pub fn save_to<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        self.inner.save_to(writer).map_err(|err| {
            SplitError::Pdf(format!("failed to serialise PDF: {}", err))
        })?;
        Ok(())
    }

    /// Serialise the document to bytes.
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.save_to(&mut output)?;
        Ok(output)
    }

    // -- Helpers --------------------------------------------------------------

    fn touch(&mut self) {
        self.revision += 1;
        self.page_ids = OnceLock::new();
    }

    fn page_ids(&self) -> &[ObjectId] {
        self.page_ids
            .get_or_init(|| self.inner.get_pages().into_values().collect())
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        let ids = self.page_ids();
        ids.get(index).copied().ok_or_else(|| {
            SplitError::Pdf(format!(
                "page {} out of range (document has {} pages)",
                index,
                ids.len()
            ))
        })
    }

    /// Text shown by the content stream of one page. Each text object ends
    /// a line. Text in fonts whose encoding cannot be read is skipped.
    fn text_of_page(&self, page_id: ObjectId) -> lopdf::Result<String> {
        let mut encodings: BTreeMap<Vec<u8>, Encoding<'_>> = BTreeMap::new();
        for (name, font) in self.inner.get_page_fonts(page_id)? {
            match font.get_font_encoding(&self.inner) {
                Ok(encoding) => {
                    encodings.insert(name, encoding);
                }
                Err(err) => debug!(
                    font = %String::from_utf8_lossy(&name),
                    %err,
                    "Unreadable font encoding, skipping its text"
                ),
            }
        }
        let content = Content::decode(&self.inner.get_page_content(page_id)?)?;

        let mut text = String::new();
        let mut encoding = None;
        for operation in &content.operations {
            match operation.operator.as_str() {
                "Tf" => {
                    encoding = operation
                        .operands
                        .first()
                        .and_then(|operand| operand.as_name().ok())
                        .and_then(|name| encodings.get(name));
                }
                "Tj" | "TJ" | "'" => {
                    if let Some(encoding) = encoding {
                        push_shown_text(&mut text, encoding, &operation.operands)?;
                    }
                }
                // aw ac string
                "\"" => {
                    if let (Some(encoding), Some(shown)) = (encoding, operation.operands.last()) {
                        push_shown_text(&mut text, encoding, std::slice::from_ref(shown))?;
                    }
                }
                "ET" => {
                    if !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                _ => {}
            }
        }
        Ok(text)
    }

    fn make_page(&self, index: usize, object_id: ObjectId) -> PdfPage {
        let media_box = self
            .inherited_attribute(object_id, b"MediaBox")
            .and_then(|object| self.parse_box(&object))
            .unwrap_or(DEFAULT_MEDIA_BOX);
        let crop_box = self
            .inherited_attribute(object_id, b"CropBox")
            .and_then(|object| self.parse_box(&object))
            .and_then(|crop| crop.intersect(&media_box))
            .unwrap_or(media_box);
        PdfPage {
            index,
            object_id,
            media_box,
            crop_box,
        }
    }

    fn page_dictionary(&self, page_id: ObjectId) -> Result<&Dictionary> {
        self.inner
            .get_dictionary(page_id)
            .map_err(|err| SplitError::Pdf(format!("cannot read page {:?}: {}", page_id, err)))
    }

    fn catalog_id(&self) -> Result<ObjectId> {
        match self.inner.trailer.get(b"Root") {
            Ok(Object::Reference(id)) => Ok(*id),
            _ => Err(SplitError::Pdf("trailer has no /Root reference".to_string())),
        }
    }

    fn pages_root_id(&self) -> Result<ObjectId> {
        let catalog = self
            .inner
            .catalog()
            .map_err(|err| SplitError::Pdf(format!("no catalog: {}", err)))?;
        match catalog.get(b"Pages") {
            Ok(Object::Reference(id)) => Ok(*id),
            _ => Err(SplitError::Pdf("/Pages is not a reference".to_string())),
        }
    }

    /// The resource dictionary of a page that has its own /Resources entry.
    fn page_resources_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary> {
        let shared = match self.page_dictionary(page_id)?.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        };
        match shared {
            Some(id) => self
                .inner
                .get_dictionary_mut(id)
                .map_err(|err| SplitError::Pdf(format!("bad /Resources: {}", err))),
            None => {
                let page = self
                    .inner
                    .get_dictionary_mut(page_id)
                    .map_err(|err| SplitError::Pdf(format!("cannot modify page: {}", err)))?;
                match page.get_mut(b"Resources") {
                    Ok(Object::Dictionary(resources)) => Ok(resources),
                    _ => Err(SplitError::Pdf("page has no /Resources dictionary".to_string())),
                }
            }
        }
    }

    /// Look up a page attribute on the page or its ancestors.
    fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let mut current = page_id;
        for _ in 0..MAX_TREE_DEPTH {
            let node = self.inner.get_dictionary(current).ok()?;
            if let Ok(value) = node.get(key) {
                return Some(value.clone());
            }
            match node.get(b"Parent") {
                Ok(Object::Reference(parent)) => current = *parent,
                _ => return None,
            }
        }
        None
    }

    /// Follow indirect references to the referenced object.
    fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        let mut current = object;
        for _ in 0..MAX_TREE_DEPTH {
            match current {
                Object::Reference(id) => match self.inner.get_object(*id) {
                    Ok(next) => current = next,
                    Err(_) => return &Object::Null,
                },
                _ => return current,
            }
        }
        &Object::Null
    }

    fn parse_box(&self, object: &Object) -> Option<PageBox> {
        let items = match self.resolve(object) {
            Object::Array(items) if items.len() == 4 => items,
            _ => return None,
        };
        let mut values = [0.0f32; 4];
        for (slot, item) in values.iter_mut().zip(items) {
            *slot = object_as_f32(self.resolve(item))?;
        }
        Some(PageBox::from_corners(values[0], values[1], values[2], values[3]))
    }

    /// Deep-copy an object of `source` into this document.
    fn import_object(&mut self, source: &PdfDocument, object: &Object) -> Object {
        match object {
            Object::Reference(id) => self.import_reference(source, *id),
            Object::Dictionary(dict) => Object::Dictionary(self.import_dictionary(source, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.import_object(source, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let mut cloned = stream.clone();
                cloned.dict = self.import_dictionary(source, &stream.dict);
                Object::Stream(cloned)
            }
            other => other.clone(),
        }
    }

    fn import_dictionary(&mut self, source: &PdfDocument, dict: &Dictionary) -> Dictionary {
        let mut cloned = Dictionary::new();
        for (key, value) in dict.iter() {
            let value = self.import_object(source, value);
            cloned.set(key.clone(), value);
        }
        cloned
    }

    fn import_reference(&mut self, source: &PdfDocument, id: ObjectId) -> Object {
        if let Some(&mapped) = self.imported.get(&(source.id, id)) {
            return Object::Reference(mapped);
        }
        let referenced = match source.inner.get_object(id) {
            Ok(object) => object,
            Err(err) => {
                warn!(?id, %err, "Cannot resolve reference, using Null");
                return Object::Null;
            }
        };
        if is_page_tree_node(referenced) {
            return Object::Null;
        }
        // Reserve the id before recursing so reference cycles terminate.
        let new_id = self.inner.new_object_id();
        self.imported.insert((source.id, id), new_id);
        let cloned = self.import_object(source, referenced);
        self.inner.objects.insert(new_id, cloned);
        Object::Reference(new_id)
    }
}

/// Numeric value of an Integer or Real object.
pub(crate) fn object_as_f32(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}

/// Append the strings of a text showing operator. Arrays end with a space,
/// as do kerning gaps wider than a tenth of an em.
fn push_shown_text(text: &mut String, encoding: &Encoding<'_>, operands: &[Object]) -> lopdf::Result<()> {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => text.push_str(&Document::decode_text(encoding, bytes)?),
            Object::Array(items) => {
                push_shown_text(text, encoding, items)?;
                text.push(' ');
            }
            Object::Integer(gap) if *gap < -100 => text.push(' '),
            Object::Real(gap) if *gap < -100.0 => text.push(' '),
            _ => {}
        }
    }
    Ok(())
}

fn is_page_tree_node(object: &Object) -> bool {
    let dict = match object {
        Object::Dictionary(dict) => dict,
        _ => return false,
    };
    matches!(dict.get(b"Type"), Ok(Object::Name(name)) if name == b"Page" || name == b"Pages")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};

    /// One-page document with inherited resources and a link annotation.
    fn source_document() -> PdfDocument {
        let mut doc = Document::with_version("1.6");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference(font_id) },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(24)]),
                Operation::new("Td", vec![Object::Integer(72), Object::Integer(700)]),
                Operation::new("Tj", vec![Object::string_literal("Hello")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.new_object_id();
        let annot_id = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![0.into(), 0.into(), 10.into(), 10.into()],
            "P" => Object::Reference(page_id),
            "Dest" => vec![Object::Reference(page_id), "Fit".into()],
        });
        doc.objects.insert(
            page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "Contents" => Object::Reference(content_id),
                "Annots" => vec![Object::Reference(annot_id)],
            }),
        );
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => Object::Integer(1),
                "Resources" => Object::Reference(resources_id),
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
            "ViewerPreferences" => dictionary! { "FitWindow" => true },
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Batch"),
            "Type" => "Info",
            "Nested" => dictionary! { "X" => Object::Integer(1) },
        });
        doc.trailer.set("Info", Object::Reference(info_id));
        PdfDocument::from_lopdf(doc)
    }

    #[test]
    fn new_empty_has_no_pages() {
        let doc = PdfDocument::new_empty("1.5");
        assert_eq!(doc.page_count(), 0);
        assert_eq!(doc.version(), "1.5");
        assert!(doc.page(0).is_err());
    }

    #[test]
    fn media_box_is_inherited() {
        let doc = source_document();
        let page = doc.page(0).expect("page 0");
        assert_eq!(page.width(), 595.0);
        assert_eq!(page.height(), 842.0);
    }

    #[test]
    fn crop_box_is_inherited_and_clipped_to_media_box() {
        let mut doc = source_document();
        let page = doc.page(0).expect("page 0");
        assert_eq!(page.crop_box, page.media_box);

        let pages_id = doc.pages_root_id().expect("pages");
        doc.as_lopdf_mut()
            .get_dictionary_mut(pages_id)
            .expect("pages node")
            .set(
                "CropBox",
                vec![Object::Integer(-10), 36.into(), 300.into(), 900.into()],
            );
        let page = doc.page(0).expect("page 0");
        assert_eq!(page.crop_box, PageBox::from_corners(0.0, 36.0, 300.0, 842.0));
        assert_eq!(page.width(), 300.0);
        assert_eq!(page.media_box.width(), 595.0);
    }

    #[test]
    fn page_list_follows_imports() {
        let source = source_document();
        let mut target = PdfDocument::new_like(&source);
        assert_eq!(target.page_count(), 0);
        let page = source.page(0).expect("page");
        target.import_page(&source, &page).expect("first import");
        assert_eq!(target.page_count(), 1);
        target.import_page(&source, &page).expect("second import");
        assert_eq!(target.page_count(), 2);
        assert_ne!(target.pages()[0].object_id, target.pages()[1].object_id);
        assert!(target.page_text(1).expect("text").contains("Hello"));
    }

    #[test]
    fn text_arrays_and_kerning_gaps_are_extracted() {
        let mut doc = source_document();
        let page = doc.page(0).expect("page");
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), Object::Integer(12)]),
                Operation::new(
                    "TJ",
                    vec![Object::Array(vec![
                        Object::string_literal("Ba"),
                        Object::Integer(-20),
                        Object::string_literal("tch"),
                        Object::Integer(-400),
                        Object::string_literal("7"),
                    ])],
                ),
                Operation::new("ET", vec![]),
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["Missing".into(), Object::Integer(12)]),
                Operation::new("Tj", vec![Object::string_literal("hidden")]),
                Operation::new("ET", vec![]),
            ],
        };
        doc.append_page_content(&page, content.encode().expect("encode"))
            .expect("append");

        let text = doc.page_text(0).expect("text");
        assert!(text.contains("Hello"), "got {text:?}");
        assert!(text.contains("Batch 7"), "got {text:?}");
        assert!(!text.contains("hidden"), "got {text:?}");
        assert_eq!(doc.extract_text(1, 1).expect("range"), text);
        assert!(doc.extract_text(1, 2).is_err());
    }

    #[test]
    fn page_text_uses_zero_based_index() {
        let doc = source_document();
        let text = doc.page_text(0).expect("text");
        assert!(text.contains("Hello"), "got {text:?}");
        assert!(doc.page_has_text(0));
        assert!(doc.page_text(1).is_err());
    }

    #[test]
    fn new_like_copies_attributes_without_nested_info() {
        let source = source_document();
        let target = PdfDocument::new_like(&source);
        assert_eq!(target.version(), "1.6");
        assert_eq!(target.info_value("Title").as_deref(), Some("Batch"));
        assert_eq!(target.info_value("Type"), None);
        assert_eq!(target.info_value("Nested"), None);
        let catalog = target.as_lopdf().catalog().expect("catalog");
        assert!(catalog.has(b"ViewerPreferences"));
    }

    #[test]
    fn import_materialises_inherited_attributes_and_clears_page_refs() {
        let source = source_document();
        let mut target = PdfDocument::new_like(&source);
        let page = source.page(0).expect("page");
        let imported = target.import_page(&source, &page).expect("import");

        assert_eq!(target.page_count(), 1);
        assert_eq!(imported.media_box, page.media_box);

        let lopdf = target.as_lopdf();
        let page_dict = lopdf.get_dictionary(imported.object_id).expect("page dict");
        assert!(page_dict.has(b"Resources"));
        assert!(page_dict.has(b"MediaBox"));

        let annots = match page_dict.get(b"Annots") {
            Ok(Object::Array(items)) => items.clone(),
            other => panic!("unexpected annots {other:?}"),
        };
        let annot_id = match annots[0] {
            Object::Reference(id) => id,
            ref other => panic!("unexpected annot {other:?}"),
        };
        let annot = lopdf.get_dictionary(annot_id).expect("annot");
        assert_eq!(annot.get(b"P").expect("P"), &Object::Null);
        match annot.get(b"Dest") {
            Ok(Object::Array(dest)) => assert_eq!(dest[0], Object::Null),
            other => panic!("unexpected dest {other:?}"),
        }

        assert!(target.page_text(0).expect("text").contains("Hello"));
    }

    #[test]
    fn shared_objects_are_imported_once() {
        let source = source_document();
        let mut target = PdfDocument::new_empty("1.6");
        let page = source.page(0).expect("page");
        target.import_page(&source, &page).expect("first");
        let objects_after_first = target.as_lopdf().objects.len();
        target.import_page(&source, &page).expect("second");
        // Content, resources, font and annotation are reused.
        assert_eq!(target.as_lopdf().objects.len(), objects_after_first + 1);
        assert_eq!(target.page_count(), 2);
    }

    #[test]
    fn appended_content_is_isolated_and_reloadable() {
        let source = source_document();
        let mut target = PdfDocument::new_like(&source);
        let page = source.page(0).expect("page");
        let page = target.import_page(&source, &page).expect("import");

        let font = target.ensure_overlay_font();
        assert_eq!(target.ensure_overlay_font(), font);
        target
            .add_page_font(&page, OVERLAY_FONT_NAME, font)
            .expect("add font");
        let revision = target.revision();
        target
            .append_page_content(&page, b"BT 3 Tr ET\n".to_vec())
            .expect("append");
        assert!(target.revision() > revision);

        let contents = target
            .as_lopdf()
            .get_page_content(page.object_id)
            .expect("content");
        let contents = String::from_utf8_lossy(&contents);
        assert!(contents.starts_with("q"));
        assert!(contents.contains("Q\nBT 3 Tr ET"));

        let bytes = target.to_bytes().expect("serialise");
        let reloaded = PdfDocument::from_bytes(&bytes).expect("reload");
        assert_eq!(reloaded.page_count(), 1);
    }

    #[test]
    fn save_records_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.pdf");
        let mut doc = source_document();
        doc.save(&path).expect("save");
        assert_eq!(doc.source_path(), Some(path.as_path()));
        let reopened = PdfDocument::open(&path).expect("open");
        assert_eq!(reopened.page_count(), 1);
    }
}
