// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    tagged = { "model.pt", Some("pt") },
    multi_dot = { "model.opt.bytes", Some("bytes") },
    lock = { "lock.model.pt", Some("pt") },
    untagged = { "model", None },
    trailing_dot = { "model.", None },
)]
fn type_tag_is_the_suffix(name: &str, expected: Option<&str>) {
    assert_eq!(CodecRegistry::type_tag(name), expected);
}

#[test]
fn passthrough_codec_is_the_identity() {
    let registry = CodecRegistry::with_defaults();
    let codec = registry.get("bytes").unwrap();
    let data = vec![1u8, 2, 3];
    assert_eq!((codec.save)(&data).unwrap(), data);
    assert_eq!((codec.load)(&data).unwrap(), data);
    (codec.delete)("x.bytes").unwrap();
}

#[test]
fn unknown_tag_is_an_error() {
    let registry = CodecRegistry::with_defaults();
    assert!(matches!(registry.get("pt"), Err(CodecError::UnknownTag(tag)) if tag == "pt"));
}

#[test]
fn duplicate_registration_is_rejected() {
    let mut registry = CodecRegistry::with_defaults();
    let result = registry.register("bytes", CkptCodec::passthrough());
    assert!(matches!(result, Err(CodecError::AlreadyRegistered { .. })));
}

#[test]
fn custom_codec_transforms_payloads() {
    let mut registry = CodecRegistry::new();
    registry
        .register(
            "rev",
            CkptCodec {
                save: Arc::new(|data| Ok(data.iter().rev().copied().collect())),
                load: Arc::new(|data| Ok(data.iter().rev().copied().collect())),
                delete: Arc::new(|_| Ok(())),
            },
        )
        .unwrap();

    let codec = registry.get("rev").unwrap();
    let saved = (codec.save)(&[1, 2, 3]).unwrap();
    assert_eq!(saved, vec![3, 2, 1]);
    assert_eq!((codec.load)(&saved).unwrap(), vec![1, 2, 3]);
}
