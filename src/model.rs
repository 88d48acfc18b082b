use egui::{Pos2, Rect};
use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, AnnotationId, AnnotationPatch};

/// Ordered annotations of one photo. Order is paint order: later entries are
/// drawn on top and win hit-test ties.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationSet(Vec<Annotation>);

impl AnnotationSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.0.iter()
    }

    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.0.iter().find(|annotation| &annotation.id == id)
    }

    fn get_mut(&mut self, id: &AnnotationId) -> Option<&mut Annotation> {
        self.0.iter_mut().find(|annotation| &annotation.id == id)
    }
}

impl From<Vec<Annotation>> for AnnotationSet {
    fn from(value: Vec<Annotation>) -> Self {
        Self(value)
    }
}

impl<'a> IntoIterator for &'a AnnotationSet {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Working copy of a photo's annotations plus the current selection.
#[derive(Clone, Debug, Default)]
pub struct AnnotationModel {
    annotations: AnnotationSet,
    selection: Option<AnnotationId>,
}

impl AnnotationModel {
    pub fn new(annotations: AnnotationSet) -> Self {
        Self {
            annotations,
            selection: None,
        }
    }

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn get(&self, id: &AnnotationId) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    pub fn replace_all(&mut self, annotations: AnnotationSet) {
        self.annotations = annotations;
        self.selection = None;
    }

    pub fn create(&mut self, annotation: Annotation) {
        tracing::debug!(id = %annotation.id, kind = annotation.kind_name(), "annotation created");
        self.annotations.0.push(annotation);
    }

    /// Applies a partial update in place. Returns `false` when the id is
    /// unknown or nothing changed.
    pub fn update(&mut self, id: &AnnotationId, patch: &AnnotationPatch) -> bool {
        match self.annotations.get_mut(id) {
            Some(annotation) => annotation.apply_patch(patch),
            None => false,
        }
    }

    /// Swaps in new geometry for an existing entry, keeping its slot in the
    /// sequence. Refused when the id or kind would change.
    pub fn replace(&mut self, id: &AnnotationId, annotation: Annotation) -> bool {
        if &annotation.id != id {
            return false;
        }
        match self.annotations.get_mut(id) {
            Some(existing) if existing.same_kind(&annotation) => {
                *existing = annotation;
                true
            }
            _ => false,
        }
    }

    pub fn delete(&mut self, id: &AnnotationId) -> bool {
        let before = self.annotations.len();
        self.annotations.0.retain(|annotation| &annotation.id != id);
        if self.selection.as_ref() == Some(id) {
            self.selection = None;
        }
        before != self.annotations.len()
    }

    /// Removes the most recently appended entry, whatever is selected.
    pub fn undo_last(&mut self) -> Option<Annotation> {
        self.annotations.0.pop()
    }

    pub fn select(&mut self, id: Option<AnnotationId>) {
        self.selection = id;
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// The selected entry, if the selected id still exists.
    pub fn selected(&self) -> Option<&Annotation> {
        self.selection
            .as_ref()
            .and_then(|id| self.annotations.get(id))
    }

    pub fn selected_id(&self) -> Option<&AnnotationId> {
        self.selected().map(|annotation| &annotation.id)
    }

    /// Topmost annotation whose hit region contains `pos`.
    pub fn hit_test(&self, pos: Pos2, overlay: Rect, zoom: f32) -> Option<&Annotation> {
        self.annotations
            .iter()
            .rev()
            .find(|annotation| annotation.hit_test(pos, overlay, zoom))
    }
}
