mod common;

use common::{bx, cat, full, iinf_v0, infe_v0, infe_v2, open};
use heifbox::parser::ParseError;
use heifbox::{CdscBox, FourCC, IinfBox, InfeBox, IrefBox, LookupError, PitmBox};

#[test]
fn iinf_collects_entries_by_id_and_name() {
    let data = iinf_v0(&[infe_v0(11, "abc", "def", "ghi")]);
    let res = open(&data).unwrap();

    assert!(res.index().get("iinf", 0).is_some());
    assert!(res.index().get("iinf.infe", 0).is_some());

    let iinf = res.find::<IinfBox>("iinf").unwrap();
    assert_eq!(iinf.entry_count, 1);
    assert_eq!(iinf.items().len(), 1);
    assert_eq!(iinf.item_with_name("abc").unwrap().item_id, 11);

    let infe = iinf.item_with_id(11).unwrap();
    assert_eq!(infe.content_type.as_deref(), Some("def"));
    assert_eq!(infe.content_encoding.as_deref(), Some("ghi"));
    assert_eq!(infe.item_type_tag(), "def");
    assert_eq!(infe.item_type, None);

    assert_eq!(
        iinf.item_with_id(12).unwrap_err(),
        LookupError::InfoItemNotFound(12)
    );
    assert_eq!(
        iinf.item_with_name("nope").unwrap_err(),
        LookupError::InfoNameNotFound("nope".into())
    );
}

#[test]
fn iinf_entries_with_distinct_ids_and_names() {
    let data = iinf_v0(&[
        infe_v0(1, "first", "", ""),
        infe_v0(2, "second", "", ""),
        infe_v0(3, "", "", ""),
        infe_v0(4, "", "", ""),
    ]);
    let res = open(&data).unwrap();
    let iinf = res.find::<IinfBox>("iinf").unwrap();
    let ids: Vec<u32> = iinf.items().iter().map(|i| i.item_id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert_eq!(iinf.item_with_name("second").unwrap().item_id, 2);
    assert_eq!(res.index().all("iinf.infe").len(), 4);
}

#[test]
fn iinf_rejects_duplicate_item_id() {
    let data = iinf_v0(&[infe_v0(11, "a", "", ""), infe_v0(11, "b", "", "")]);
    let err = open(&data).unwrap_err();
    assert!(matches!(err, ParseError::DuplicateItem { .. }), "{err}");
    assert!(!err.is_malformed());

    // ids stay unique even when names are empty
    let data = iinf_v0(&[infe_v0(11, "", "", ""), infe_v0(11, "", "", "")]);
    assert!(matches!(open(&data).unwrap_err(), ParseError::DuplicateItem { .. }));
}

#[test]
fn iinf_accepts_repeated_empty_names() {
    let data = iinf_v0(&[infe_v0(1, "", "", ""), infe_v0(2, "", "", "")]);
    let res = open(&data).unwrap();
    let iinf = res.find::<IinfBox>("iinf").unwrap();

    assert_eq!(iinf.items().len(), 2);
    assert_eq!(iinf.item_with_id(2).unwrap().name, "");
    assert_eq!(
        iinf.item_with_name("").unwrap_err(),
        LookupError::InfoNameNotFound(String::new())
    );
}

#[test]
fn iinf_rejects_duplicate_item_name() {
    let data = iinf_v0(&[infe_v0(11, "abc", "", ""), infe_v0(12, "abc", "", "")]);
    let err = open(&data).unwrap_err();
    assert!(matches!(err, ParseError::DuplicateItem { .. }), "{err}");
}

#[test]
fn iinf_version_1_has_32_bit_count() {
    let mut p = 1u32.to_be_bytes().to_vec();
    p.extend_from_slice(&infe_v2(5, b"hvc1", "main"));
    let res = open(&full(b"iinf", 1, 0, &p)).unwrap();
    let iinf = res.find::<IinfBox>("iinf").unwrap();
    assert_eq!(iinf.version, 1);
    assert_eq!(iinf.item_with_id(5).unwrap().item_type, Some(FourCC(*b"hvc1")));
}

#[test]
fn infe_outside_iinf_is_rejected() {
    let err = open(&infe_v0(1, "a", "", "")).unwrap_err();
    match err {
        ParseError::Lookup { path, source } => {
            assert_eq!(path, "infe");
            assert_eq!(source, LookupError::NoAncestor("iinf"));
        }
        other => panic!("expected Lookup, got {other}"),
    }
}

#[test]
fn infe_version_1_extension_type() {
    let mut p = vec![0, 7, 0, 0];
    p.extend_from_slice(b"n\0text/plain\0\0fdel");
    let res = open(&iinf_v0(&[full(b"infe", 1, 0, &p)])).unwrap();
    let infe = res.find::<InfeBox>("iinf.infe").unwrap();
    assert_eq!(infe.item_id, 7);
    assert_eq!(infe.name, "n");
    assert_eq!(infe.extension_type, Some(FourCC(*b"fdel")));
}

#[test]
fn infe_version_2_mime_and_uri() {
    let mime = {
        let mut p = vec![0, 1, 0, 0];
        p.extend_from_slice(b"mimexmp\0application/rdf+xml\0gzip\0");
        full(b"infe", 2, 0, &p)
    };
    let uri = {
        let mut p = vec![0, 2, 0, 0];
        p.extend_from_slice(b"uri \0urn:example:meta\0");
        full(b"infe", 2, 1, &p)
    };
    let res = open(&iinf_v0(&[mime, uri])).unwrap();
    let iinf = res.find::<IinfBox>("iinf").unwrap();

    let xmp = iinf.item_with_id(1).unwrap();
    assert_eq!(xmp.item_type_tag(), "mime");
    assert_eq!(xmp.item_type, Some(FourCC(*b"mime")));
    assert_eq!(xmp.name, "xmp");
    assert_eq!(xmp.content_type.as_deref(), Some("application/rdf+xml"));
    assert_eq!(xmp.content_encoding.as_deref(), Some("gzip"));
    assert_eq!(xmp.uri_type, None);

    let u = iinf.item_with_id(2).unwrap();
    assert_eq!(u.flags, 1);
    assert_eq!(u.item_type, Some(FourCC(*b"uri ")));
    assert_eq!(u.uri_type.as_deref(), Some("urn:example:meta"));
    assert_eq!(u.item_type_tag(), "uri");
}

#[test]
fn infe_version_3_has_32_bit_id() {
    let mut p = 70000u32.to_be_bytes().to_vec();
    p.extend_from_slice(&[0, 0]);
    p.extend_from_slice(b"hvc1\0");
    let res = open(&iinf_v0(&[full(b"infe", 3, 0, &p)])).unwrap();
    let infe = res.find::<IinfBox>("iinf").unwrap().item_with_id(70000).unwrap();
    assert_eq!(infe.item_type, Some(FourCC(*b"hvc1")));
    assert_eq!(infe.name, "");
}

#[test]
fn infe_protected_items_are_unsupported() {
    let mut p = vec![0, 1, 0, 1];
    p.extend_from_slice(b"hvc1\0");
    let err = open(&iinf_v0(&[full(b"infe", 2, 0, &p)])).unwrap_err();
    assert!(matches!(err, ParseError::Unsupported { .. }), "{err}");
}

#[test]
fn infe_unknown_version_is_unsupported() {
    let err = open(&iinf_v0(&[full(b"infe", 4, 0, &[0; 8])])).unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedVersion { version: 4, .. }));
}

#[test]
fn cdsc_outside_iref_is_rejected() {
    let err = open(&bx(b"cdsc", &[0, 2, 0, 1, 0, 1])).unwrap_err();
    match err {
        ParseError::Lookup { source, .. } => assert_eq!(source, LookupError::NoAncestor("iref")),
        other => panic!("expected Lookup, got {other}"),
    }
}

#[test]
fn cdsc_with_16_bit_ids() {
    let refs = cat(&[
        &bx(b"cdsc", &[0, 2, 0, 1, 0, 1]),
        &bx(b"thmb", &[0, 3, 0, 2, 0, 1, 0, 4]),
    ]);
    let res = open(&full(b"iref", 0, 0, &refs)).unwrap();

    let cdsc = res.find::<CdscBox>("iref.cdsc").unwrap();
    assert_eq!(cdsc.from_item_id, 2);
    assert_eq!(cdsc.to_item_ids, vec![1]);

    let iref = res.find::<IrefBox>("iref").unwrap();
    assert_eq!(iref.references().len(), 2);
    let thmb = iref.references_from(3).next().unwrap();
    assert_eq!(thmb.reference_type, FourCC(*b"thmb"));
    assert_eq!(thmb.to_item_ids, vec![1, 4]);
    assert_eq!(iref.references_from(1).count(), 0);
}

#[test]
fn cdsc_with_32_bit_ids() {
    let mut p = 100_000u32.to_be_bytes().to_vec();
    p.extend_from_slice(&1u16.to_be_bytes());
    p.extend_from_slice(&7u32.to_be_bytes());
    let res = open(&full(b"iref", 1, 0, &bx(b"cdsc", &p))).unwrap();
    let cdsc = res.find::<CdscBox>("iref.cdsc").unwrap();
    assert_eq!(cdsc.from_item_id, 100_000);
    assert_eq!(cdsc.to_item_ids, vec![7]);
}

#[test]
fn pitm_versions() {
    let res = open(&full(b"pitm", 0, 0, &[0, 7])).unwrap();
    assert_eq!(res.find::<PitmBox>("pitm").unwrap().item_id, 7);

    let res = open(&full(b"pitm", 1, 0, &70_000u32.to_be_bytes())).unwrap();
    assert_eq!(res.find::<PitmBox>("pitm").unwrap().item_id, 70_000);

    let err = open(&full(b"pitm", 2, 0, &[0, 0, 0, 1])).unwrap_err();
    assert!(matches!(err, ParseError::UnsupportedVersion { version: 2, .. }));
}

#[test]
fn primary_item_comes_from_meta() {
    let data = full(
        b"meta",
        0,
        0,
        &cat(&[&iinf_v0(&[infe_v2(3, b"hvc1", "")]), &full(b"pitm", 0, 0, &[0, 3])]),
    );
    let res = open(&data).unwrap();
    assert_eq!(res.primary_item_id().unwrap(), 3);

    let res = open(&iinf_v0(&[])).unwrap();
    assert_eq!(
        res.primary_item_id().unwrap_err(),
        LookupError::NotFound("meta.pitm".into())
    );
}
