//! The standard data element dictionary: static metadata describing the
//! attributes known to this implementation, with lookup by tag or keyword.
pub mod entries;
pub mod tags;

use crate::header::Tag;
use crate::vm::ValueMultiplicity;
use crate::vr::VR;

pub use entries::ENTRIES;

/// Static metadata of a dictionary attribute.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct TagInfo {
    /// The attribute tag.
    pub tag: Tag,
    /// The canonical value representation.
    pub vr: VR,
    /// The value multiplicity constraint.
    pub vm: ValueMultiplicity,
    /// The standard keyword (no spaces).
    pub keyword: &'static str,
    /// The human-readable attribute name.
    pub name: &'static str,
    /// Whether the attribute is retired in the standard.
    pub retired: bool,
}

/// Look up the dictionary entry for the given tag.
pub fn lookup<T: Into<Tag>>(tag: T) -> Option<&'static TagInfo> {
    let tag = tag.into();
    ENTRIES
        .binary_search_by_key(&tag, |e| e.tag)
        .ok()
        .map(|i| &ENTRIES[i])
}

/// Look up a dictionary entry by its keyword.
pub fn lookup_keyword(keyword: &str) -> Option<&'static TagInfo> {
    ENTRIES.iter().find(|e| e.keyword == keyword)
}

/// Resolve the value representation to assume for a tag when the
/// encoding does not carry one (Implicit VR).
///
/// Falls back on the generic rules for group lengths and private
/// creators; anything else unknown is treated as UN.
pub fn vr_of<T: Into<Tag>>(tag: T) -> VR {
    let tag = tag.into();
    if let Some(info) = lookup(tag) {
        return info.vr;
    }
    if tag.element() == 0x0000 {
        // generic group length
        return VR::UL;
    }
    if tag.group() % 2 == 1 && (0x0010..0x0100).contains(&tag.element()) {
        // private creator
        return VR::LO;
    }
    VR::UN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_sorted_by_tag() {
        for w in ENTRIES.windows(2) {
            assert!(
                w[0].tag < w[1].tag,
                "entries out of order near {}",
                w[1].tag
            );
        }
    }

    #[test]
    fn lookup_known_tags() {
        let info = lookup(tags::PATIENT_NAME).unwrap();
        assert_eq!(info.vr, VR::PN);
        assert_eq!(info.keyword, "PatientName");
        let info = lookup(tags::STUDY_INSTANCE_UID).unwrap();
        assert_eq!(info.vr, VR::UI);
    }

    #[test]
    fn lookup_by_keyword() {
        let info = lookup_keyword("Modality").unwrap();
        assert_eq!(info.tag, tags::MODALITY);
    }

    #[test]
    fn implicit_vr_fallbacks() {
        assert_eq!(vr_of(Tag(0x7777, 0x0000)), VR::UL);
        assert_eq!(vr_of(Tag(0x0009, 0x0010)), VR::LO);
        assert_eq!(vr_of(Tag(0x7777, 0x1234)), VR::UN);
        assert_eq!(vr_of(tags::PIXEL_DATA), VR::OW);
    }
}
