//! The in-memory DICOM data set: an ordered mapping from tag to element.
use crate::error::{MissingElementSnafu, Result};
use crate::header::Tag;
use crate::value::{DataElement, Value};
use crate::vr::VR;
use snafu::OptionExt;
use std::collections::{btree_map, BTreeMap};
use std::fmt;

/// An ordered collection of data elements, keyed and iterated
/// in ascending tag order. Sequence elements own their items.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct DataSet {
    elements: BTreeMap<Tag, DataElement>,
}

impl DataSet {
    /// Create an empty data set.
    pub fn new() -> Self {
        DataSet::default()
    }

    /// Insert a data element, replacing any element with the same tag.
    pub fn put(&mut self, element: DataElement) {
        self.elements.insert(element.tag, element);
    }

    /// Insert a string-valued element.
    pub fn put_str<T: Into<Tag>>(&mut self, tag: T, vr: VR, text: &str) {
        self.put(DataElement::from_str(tag, vr, text));
    }

    /// Insert an unsigned 16-bit element.
    pub fn put_u16<T: Into<Tag>>(&mut self, tag: T, vr: VR, value: u16) {
        self.put(DataElement::from_u16(tag, vr, value));
    }

    /// Retrieve the element with the given tag, if present.
    pub fn get<T: Into<Tag>>(&self, tag: T) -> Option<&DataElement> {
        self.elements.get(&tag.into())
    }

    /// Retrieve the element with the given tag,
    /// raising an error if it is absent.
    pub fn element<T: Into<Tag>>(&self, tag: T) -> Result<&DataElement> {
        let tag = tag.into();
        self.elements.get(&tag).context(MissingElementSnafu { tag })
    }

    /// Retrieve a trimmed string value, `None` when the element is absent
    /// or empty.
    pub fn get_str<T: Into<Tag>>(&self, tag: T) -> Option<String> {
        let e = self.elements.get(&tag.into())?;
        match e.to_str() {
            Ok(s) if !s.is_empty() => Some(s.to_string()),
            _ => None,
        }
    }

    /// Retrieve a single unsigned 16-bit value, `None` when absent.
    pub fn get_u16<T: Into<Tag>>(&self, tag: T) -> Option<u16> {
        self.elements.get(&tag.into()).and_then(|e| e.to_u16().ok())
    }

    /// Retrieve a single unsigned 32-bit value, `None` when absent.
    pub fn get_u32<T: Into<Tag>>(&self, tag: T) -> Option<u32> {
        self.elements.get(&tag.into()).and_then(|e| e.to_u32().ok())
    }

    /// Retrieve a multi-valued string, empty when absent.
    pub fn get_strs<T: Into<Tag>>(&self, tag: T) -> Vec<String> {
        self.elements
            .get(&tag.into())
            .and_then(|e| e.to_multi_str().ok())
            .unwrap_or_default()
    }

    /// Remove the element with the given tag, returning it if present.
    pub fn remove<T: Into<Tag>>(&mut self, tag: T) -> Option<DataElement> {
        self.elements.remove(&tag.into())
    }

    /// Whether the data set contains an element with the given tag.
    pub fn contains<T: Into<Tag>>(&self, tag: T) -> bool {
        self.elements.contains_key(&tag.into())
    }

    /// The number of elements in the data set.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the data set has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate over the elements in ascending tag order.
    pub fn iter(&self) -> impl Iterator<Item = &DataElement> {
        self.elements.values()
    }

    /// Iterate over the tags in ascending order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.elements.keys().copied()
    }

    /// Retrieve the items of a sequence element, if present.
    pub fn sequence_items<T: Into<Tag>>(&self, tag: T) -> Option<&[DataSet]> {
        match self.elements.get(&tag.into()).map(|e| &e.value) {
            Some(Value::Sequence(items)) => Some(items),
            _ => None,
        }
    }
}

impl IntoIterator for DataSet {
    type Item = DataElement;
    type IntoIter = std::iter::Map<
        btree_map::IntoIter<Tag, DataElement>,
        fn((Tag, DataElement)) -> DataElement,
    >;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter().map(|(_, e)| e)
    }
}

impl FromIterator<DataElement> for DataSet {
    fn from_iter<I: IntoIterator<Item = DataElement>>(iter: I) -> Self {
        let mut ds = DataSet::new();
        for e in iter {
            ds.put(e);
        }
        ds
    }
}

impl fmt::Display for DataSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for e in self.iter() {
            writeln!(f, "{}", e)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::tags;

    #[test]
    fn iteration_is_ascending_by_tag() {
        let mut ds = DataSet::new();
        ds.put_str(tags::PATIENT_ID, VR::LO, "P001");
        ds.put_str(tags::SOP_INSTANCE_UID, VR::UI, "1.2.3");
        ds.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
        let order: Vec<Tag> = ds.tags().collect();
        assert_eq!(
            order,
            vec![tags::SOP_INSTANCE_UID, tags::PATIENT_NAME, tags::PATIENT_ID]
        );
    }

    #[test]
    fn put_replaces_same_tag() {
        let mut ds = DataSet::new();
        ds.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JOHN");
        ds.put_str(tags::PATIENT_NAME, VR::PN, "DOE^JANE");
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.get_str(tags::PATIENT_NAME).unwrap(), "DOE^JANE");
    }

    #[test]
    fn missing_element_is_an_error() {
        let ds = DataSet::new();
        assert!(ds.element(tags::PATIENT_NAME).is_err());
        assert!(ds.get_str(tags::PATIENT_NAME).is_none());
    }

    #[test]
    fn empty_string_values_read_as_none() {
        let mut ds = DataSet::new();
        ds.put_str(tags::ACCESSION_NUMBER, VR::SH, "");
        assert!(ds.get_str(tags::ACCESSION_NUMBER).is_none());
    }
}
