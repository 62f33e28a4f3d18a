use assert_matches::assert_matches;

use chemfetch::domain::{MoleculeId, StructureFormat, StructureQuery, Threshold};
use chemfetch::error::ChemFetchError;

#[test]
fn parse_molecule_id_valid() {
    let id: MoleculeId = "2244".parse().unwrap();
    assert_eq!(id.get(), 2244);
    assert_eq!(id.to_string(), "2244");
}

#[test]
fn parse_molecule_id_invalid() {
    for input in ["", "0", "12a", "1.5", "-3"] {
        let err = input.parse::<MoleculeId>().unwrap_err();
        assert_matches!(err, ChemFetchError::InvalidMoleculeId(_));
    }
}

#[test]
fn molecule_id_serializes_as_number() {
    let id = MoleculeId::new(702).unwrap();
    assert_eq!(serde_json::to_string(&id).unwrap(), "702");
    let back: MoleculeId = serde_json::from_str("702").unwrap();
    assert_eq!(back, id);
}

#[test]
fn structure_query_keeps_notation_verbatim() {
    let query: StructureQuery = "  C1=CC=C(C=C1)/C=C/C#N ".parse().unwrap();
    assert_eq!(query.as_str(), "C1=CC=C(C=C1)/C=C/C#N");
}

#[test]
fn threshold_deserialization_is_checked() {
    let ok: Threshold = serde_json::from_str("90").unwrap();
    assert_eq!(ok.get(), 90);
    assert!(serde_json::from_str::<Threshold>("150").is_err());
}

#[test]
fn structure_format_segments() {
    assert_eq!(StructureFormat::Sdf.path_segment(), "SDF");
    assert!(StructureFormat::Json.is_json());
    assert!(!StructureFormat::Asnt.is_json());
}
