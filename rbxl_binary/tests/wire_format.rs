use std::convert::TryInto;
use std::f32::consts::FRAC_1_SQRT_2;
use std::io::Read;

use rbxl_binary::{DecodeOptions, DecodedChunk, DecodedModel, DecodedValues, Warning};
use rbxl_dom::{Dom, InstanceBuilder};
use rbxl_dom::types::{CFrame, Matrix3, Ref, SharedString, Variant, Vector3};

fn header(num_types: u32, num_instances: u32) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"<roblox!");
    out.extend_from_slice(&[0x89, 0xff, 0x0d, 0x0a, 0x1a, 0x0a]);
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&num_types.to_le_bytes());
    out.extend_from_slice(&num_instances.to_le_bytes());
    out.extend_from_slice(&[0; 8]);
    out
}

fn chunk(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(name);
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn end_chunk() -> Vec<u8> {
    chunk(b"END\0", b"</roblox>")
}

fn lp_string(value: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    out.extend_from_slice(value.as_bytes());
    out
}

/// Walk the chunks of a file whose chunks are all uncompressed.
fn raw_chunks(bytes: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    assert!(bytes.len() >= 32, "file too short to hold a header");

    let mut offset = 32;
    let mut chunks = Vec::new();

    loop {
        let name = bytes[offset..offset + 4].to_vec();
        let compressed_len =
            u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().unwrap());
        let len = u32::from_le_bytes(bytes[offset + 8..offset + 12].try_into().unwrap());

        assert_eq!(compressed_len, 0, "expected only uncompressed chunks");

        let payload = bytes[offset + 16..offset + 16 + len as usize].to_vec();
        offset += 16 + len as usize;

        let is_end = name == b"END\0";
        chunks.push((name, payload));

        if is_end {
            break;
        }
    }

    chunks
}

fn interleave_f32(values: &[f32]) -> Vec<u8> {
    let mut out = Vec::new();

    for shift in &[24, 16, 8, 0] {
        for value in values {
            let bits = value.to_bits();
            let encoded = (bits << 1) | (bits >> 31);
            out.push((encoded >> shift) as u8);
        }
    }

    out
}

#[test]
fn empty_place_decodes() {
    let mut file = header(0, 0);
    file.extend(end_chunk());

    let decoded = rbxl_binary::decode_place(file.as_slice()).unwrap();

    assert_eq!(decoded.dom.root_refs().len(), 0);
    assert!(decoded.dom.metadata().is_empty());
    assert_eq!(decoded.warnings, Vec::new());
}

#[test]
fn int_property_column_bytes() {
    let mut dom = Dom::new();
    dom.insert(
        Ref::none(),
        InstanceBuilder::new("IntValue").with_property("Value", 42),
    );
    dom.insert(
        Ref::none(),
        InstanceBuilder::new("IntValue").with_property("Value", -37),
    );

    let mut buffer = Vec::new();
    rbxl_binary::EncodeOptions::model()
        .uncompressed(true)
        .encode(&dom, &mut buffer)
        .unwrap();

    // class id 0, "Value", Int32 tag, then the zigzagged, byte-interleaved
    // column for [42, -37].
    let mut expected = Vec::new();
    expected.extend_from_slice(&0u32.to_le_bytes());
    expected.extend(lp_string("Value"));
    expected.push(0x03);
    expected.extend_from_slice(&[0, 0, 0, 0, 0, 0, 0x54, 0x49]);

    let chunks = raw_chunks(&buffer);
    let payload = chunks
        .iter()
        .find(|(name, payload)| name == b"PROP" && payload[4..].starts_with(&lp_string("Value")))
        .map(|(_, payload)| payload.clone())
        .expect("no PROP chunk for Value");

    assert_eq!(payload, expected);
}

#[test]
fn cframe_array_layout() {
    let rot45 = Matrix3::new(
        Vector3::new(FRAC_1_SQRT_2, -FRAC_1_SQRT_2, 0.0),
        Vector3::new(FRAC_1_SQRT_2, FRAC_1_SQRT_2, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
    );

    let mut dom = Dom::new();
    dom.insert(
        Ref::none(),
        InstanceBuilder::new("Part").with_name("A").with_property(
            "CFrame",
            CFrame::new(Vector3::new(1.0, 2.0, 3.0), Matrix3::identity()),
        ),
    );
    dom.insert(
        Ref::none(),
        InstanceBuilder::new("Part").with_name("B").with_property(
            "CFrame",
            CFrame::new(Vector3::new(0.0, 0.0, 0.0), rot45),
        ),
    );

    let mut buffer = Vec::new();
    rbxl_binary::EncodeOptions::model()
        .uncompressed(true)
        .encode(&dom, &mut buffer)
        .unwrap();

    // All rotation records come first (the identity collapses to id 0x02,
    // the 45-degree rotation is id 0x00 plus nine floats), then one
    // position block with three interleaved float columns.
    let mut expected = Vec::new();
    expected.extend_from_slice(&0u32.to_le_bytes());
    expected.extend(lp_string("CFrame"));
    expected.push(0x10);

    expected.push(0x02);

    expected.push(0x00);
    for row in &[rot45.x, rot45.y, rot45.z] {
        expected.extend_from_slice(&row.x.to_le_bytes());
        expected.extend_from_slice(&row.y.to_le_bytes());
        expected.extend_from_slice(&row.z.to_le_bytes());
    }

    expected.extend(interleave_f32(&[1.0, 0.0]));
    expected.extend(interleave_f32(&[2.0, 0.0]));
    expected.extend(interleave_f32(&[3.0, 0.0]));

    let chunks = raw_chunks(&buffer);
    let payload = chunks
        .iter()
        .find(|(name, payload)| name == b"PROP" && payload[4..].starts_with(&lp_string("CFrame")))
        .map(|(_, payload)| payload.clone())
        .expect("no PROP chunk for CFrame");

    assert_eq!(payload, expected);

    // And the values read back bit-for-bit.
    let model = DecodedModel::from_reader(buffer.as_slice()).unwrap();
    let values = model
        .chunks
        .iter()
        .find_map(|decoded| match decoded {
            DecodedChunk::Prop {
                prop_name, values, ..
            } if prop_name == "CFrame" => values.as_ref(),
            _ => None,
        })
        .expect("no decoded CFrame values");

    match values {
        DecodedValues::CFrame(cframes) => {
            assert_eq!(cframes.len(), 2);
            assert_eq!(cframes[0].orientation, Matrix3::identity());
            assert_eq!(cframes[0].position, Vector3::new(1.0, 2.0, 3.0));
            assert_eq!(cframes[1].orientation, rot45);
            assert_eq!(cframes[1].position, Vector3::new(0.0, 0.0, 0.0));
        }
        other => panic!("expected CFrame values, got {:?}", other),
    }
}

#[test]
fn shared_strings_deduplicate() {
    let shared = SharedString::new(b"abc".to_vec());

    let mut dom = Dom::new();
    dom.insert(
        Ref::none(),
        InstanceBuilder::new("Folder")
            .with_name("A")
            .with_property("Blob", Variant::SharedString(shared.clone())),
    );
    dom.insert(
        Ref::none(),
        InstanceBuilder::new("Folder")
            .with_name("B")
            .with_property("Blob", Variant::SharedString(shared)),
    );

    let mut buffer = Vec::new();
    rbxl_binary::encode_model(&dom, &mut buffer).unwrap();

    let model = DecodedModel::from_reader(buffer.as_slice()).unwrap();

    let entry_count = model
        .chunks
        .iter()
        .find_map(|decoded| match decoded {
            DecodedChunk::Sstr { entries, .. } => Some(entries.len()),
            _ => None,
        })
        .expect("no SSTR chunk");
    assert_eq!(entry_count, 1);

    let indices = model
        .chunks
        .iter()
        .find_map(|decoded| match decoded {
            DecodedChunk::Prop {
                prop_name, values, ..
            } if prop_name == "Blob" => values.as_ref(),
            _ => None,
        })
        .expect("no decoded Blob values");

    match indices {
        DecodedValues::SharedString(indices) => assert_eq!(indices, &[0, 0]),
        other => panic!("expected shared string indices, got {:?}", other),
    }

    // Both instances read back the same bytes.
    let decoded = rbxl_binary::decode_model(buffer.as_slice()).unwrap();
    for root in decoded.dom.root_refs() {
        let instance = decoded.dom.get_by_ref(*root).unwrap();
        match instance.properties.get("Blob") {
            Some(Variant::SharedString(value)) => assert_eq!(value.data(), b"abc"),
            other => panic!("expected a shared string, got {:?}", other),
        }
    }
}

#[test]
fn xml_files_delegate_when_enabled() {
    let input = b"<roblox version=\"4\"></roblox>".to_vec();
    let mut seen = Vec::new();

    let decoded = DecodeOptions::place()
        .xml_decoder(|reader: &mut dyn Read| {
            let mut buffer = Vec::new();
            reader.read_to_end(&mut buffer)?;
            seen = buffer;

            let mut dom = Dom::new();
            dom.insert(Ref::none(), InstanceBuilder::new("FromXml"));
            Ok(dom)
        })
        .decode(input.as_slice())
        .unwrap();

    // The delegate sees the whole stream, sniffed prefix included.
    assert_eq!(seen, input);

    let root = decoded.dom.get_by_ref(decoded.dom.root_refs()[0]).unwrap();
    assert_eq!(root.class, "FromXml");
}

#[test]
fn xml_files_are_rejected_with_no_xml() {
    let input = b"<roblox version=\"4\"></roblox>".to_vec();

    let err = DecodeOptions::place()
        .no_xml(true)
        .decode(input.as_slice())
        .unwrap_err();

    assert!(err.to_string().contains("signature"), "got: {}", err);
}

#[test]
fn xml_files_error_without_a_decoder() {
    let input = b"<roblox version=\"4\"></roblox>".to_vec();

    let err = DecodeOptions::place().decode(input.as_slice()).unwrap_err();
    assert!(err.to_string().contains("XML decoder"), "got: {}", err);
}

#[test]
fn garbage_is_an_invalid_signature() {
    let err = rbxl_binary::decode_place(&b"definitely not a place file"[..]).unwrap_err();
    assert!(err.to_string().contains("signature"), "got: {}", err);
}

#[test]
fn nonzero_reserved_bytes_warn() {
    let mut file = Vec::new();
    file.extend_from_slice(b"<roblox!");
    file.extend_from_slice(&[0x89, 0xff, 0x0d, 0x0a, 0x1a, 0x0a]);
    file.extend_from_slice(&0u16.to_le_bytes());
    file.extend_from_slice(&0u32.to_le_bytes());
    file.extend_from_slice(&0u32.to_le_bytes());
    file.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0]);
    file.extend(end_chunk());

    let decoded = rbxl_binary::decode_place(file.as_slice()).unwrap();
    assert!(decoded.warnings.contains(&Warning::NonZeroReserved));
}

#[test]
fn unknown_chunks_warn_and_are_skipped() {
    let mut file = header(0, 0);
    file.extend(chunk(b"QQQQ", b"mystery payload"));
    file.extend(end_chunk());

    let decoded = rbxl_binary::decode_place(file.as_slice()).unwrap();

    assert_eq!(decoded.dom.root_refs().len(), 0);
    assert!(decoded.warnings.iter().any(|warning| matches!(
        warning,
        Warning::UnknownChunk { name } if name == "QQQQ"
    )));
}

#[test]
fn compressed_end_chunk_warns() {
    // A hand-built LZ4 block: one token declaring nine literals, then the
    // nine literal bytes.
    let mut compressed_end = Vec::new();
    compressed_end.extend_from_slice(b"END\0");
    compressed_end.extend_from_slice(&10u32.to_le_bytes());
    compressed_end.extend_from_slice(&9u32.to_le_bytes());
    compressed_end.extend_from_slice(&0u32.to_le_bytes());
    compressed_end.push(0x90);
    compressed_end.extend_from_slice(b"</roblox>");

    let mut file = header(0, 0);
    file.extend(compressed_end);

    let decoded = rbxl_binary::decode_place(file.as_slice()).unwrap();
    assert!(decoded.warnings.contains(&Warning::CompressedEnd));
}

#[test]
fn unexpected_end_contents_warn() {
    let mut file = header(0, 0);
    file.extend(chunk(b"END\0", b"goodbye, roblox"));

    let decoded = rbxl_binary::decode_place(file.as_slice()).unwrap();
    assert!(decoded.warnings.contains(&Warning::UnexpectedEndContents));
}

fn single_folder_file(prop_chunk_payload: &[u8]) -> Vec<u8> {
    let mut inst = Vec::new();
    inst.extend_from_slice(&0u32.to_le_bytes());
    inst.extend(lp_string("Folder"));
    inst.push(0);
    inst.extend_from_slice(&1u32.to_le_bytes());
    inst.extend_from_slice(&[0, 0, 0, 0]); // referent 0

    let mut prnt = Vec::new();
    prnt.push(0);
    prnt.extend_from_slice(&1u32.to_le_bytes());
    prnt.extend_from_slice(&[0, 0, 0, 0]); // child 0
    prnt.extend_from_slice(&[0, 0, 0, 1]); // parent -1

    let mut file = header(1, 1);
    file.extend(chunk(b"INST", &inst));
    file.extend(chunk(b"PROP", prop_chunk_payload));
    file.extend(chunk(b"PRNT", &prnt));
    file.extend(end_chunk());
    file
}

#[test]
fn out_of_range_shared_string_warns_and_yields_empty() {
    let mut prop = Vec::new();
    prop.extend_from_slice(&0u32.to_le_bytes());
    prop.extend(lp_string("Blob"));
    prop.push(0x1C);
    prop.extend_from_slice(&[0, 0, 0, 5]); // index 5, but there is no SSTR

    let file = single_folder_file(&prop);
    let decoded = rbxl_binary::decode_place(file.as_slice()).unwrap();

    assert!(decoded.warnings.iter().any(|warning| matches!(
        warning,
        Warning::SharedStringOutOfRange { index: 5, count: 0 }
    )));

    let root = decoded.dom.get_by_ref(decoded.dom.root_refs()[0]).unwrap();
    match root.properties.get("Blob") {
        Some(Variant::SharedString(value)) => assert!(value.is_empty()),
        other => panic!("expected an empty shared string, got {:?}", other),
    }
}

#[test]
fn unknown_prop_type_warns_by_default_and_fails_strict() {
    let mut prop = Vec::new();
    prop.extend_from_slice(&0u32.to_le_bytes());
    prop.extend(lp_string("Value"));
    prop.push(0x7F);

    let file = single_folder_file(&prop);

    let decoded = DecodeOptions::place().decode(file.as_slice()).unwrap();
    assert!(decoded.warnings.iter().any(|warning| matches!(
        warning,
        Warning::InvalidChunk { name, .. } if name == "PROP"
    )));
    assert_eq!(decoded.dom.root_refs().len(), 1);

    let err = DecodeOptions::place()
        .strict(true)
        .decode(file.as_slice())
        .unwrap_err();
    assert!(err.to_string().contains("PROP"), "got: {}", err);
}

#[test]
fn unsupported_prnt_version_warns_by_default() {
    let mut prnt = Vec::new();
    prnt.push(1); // not a version this format has
    prnt.extend_from_slice(&0u32.to_le_bytes());

    let mut file = header(0, 0);
    file.extend(chunk(b"PRNT", &prnt));
    file.extend(end_chunk());

    let decoded = rbxl_binary::decode_place(file.as_slice()).unwrap();
    assert!(decoded.warnings.iter().any(|warning| matches!(
        warning,
        Warning::InvalidChunk { name, .. } if name == "PRNT"
    )));
}

#[test]
fn duplicate_referents_are_fatal() {
    let mut first = Vec::new();
    first.extend_from_slice(&0u32.to_le_bytes());
    first.extend(lp_string("Folder"));
    first.push(0);
    first.extend_from_slice(&1u32.to_le_bytes());
    first.extend_from_slice(&[0, 0, 0, 0]);

    let mut second = Vec::new();
    second.extend_from_slice(&1u32.to_le_bytes());
    second.extend(lp_string("Part"));
    second.push(0);
    second.extend_from_slice(&1u32.to_le_bytes());
    second.extend_from_slice(&[0, 0, 0, 0]); // referent 0 again

    let mut file = header(2, 2);
    file.extend(chunk(b"INST", &first));
    file.extend(chunk(b"INST", &second));
    file.extend(end_chunk());

    let err = rbxl_binary::decode_place(file.as_slice()).unwrap_err();
    assert!(err.to_string().contains("more than once"), "got: {}", err);
}

#[test]
fn inst_referent_beyond_instance_count_is_fatal() {
    let mut inst = Vec::new();
    inst.extend_from_slice(&0u32.to_le_bytes());
    inst.extend(lp_string("Folder"));
    inst.push(0);
    inst.extend_from_slice(&1u32.to_le_bytes());
    inst.extend_from_slice(&[0, 0, 0, 0x0A]); // referent 5, but only 1 declared

    let mut file = header(1, 1);
    file.extend(chunk(b"INST", &inst));
    file.extend(end_chunk());

    let err = rbxl_binary::decode_place(file.as_slice()).unwrap_err();
    assert!(err.to_string().contains("out of bounds"), "got: {}", err);
}

#[test]
fn prnt_referent_beyond_instance_count_is_fatal() {
    let mut inst = Vec::new();
    inst.extend_from_slice(&0u32.to_le_bytes());
    inst.extend(lp_string("Folder"));
    inst.push(0);
    inst.extend_from_slice(&1u32.to_le_bytes());
    inst.extend_from_slice(&[0, 0, 0, 0]); // referent 0

    let mut prnt = Vec::new();
    prnt.push(0);
    prnt.extend_from_slice(&1u32.to_le_bytes());
    prnt.extend_from_slice(&[0, 0, 0, 0]); // child 0
    prnt.extend_from_slice(&[0, 0, 0, 0x0E]); // parent 7, but only 1 declared

    let mut file = header(1, 1);
    file.extend(chunk(b"INST", &inst));
    file.extend(chunk(b"PRNT", &prnt));
    file.extend(end_chunk());

    let err = rbxl_binary::decode_place(file.as_slice()).unwrap_err();
    assert!(err.to_string().contains("out of bounds"), "got: {}", err);
}

#[test]
fn ref_property_beyond_instance_count_is_fatal() {
    let mut prop = Vec::new();
    prop.extend_from_slice(&0u32.to_le_bytes());
    prop.extend(lp_string("Value"));
    prop.push(0x13);
    prop.extend_from_slice(&[0, 0, 0, 6]); // target 3, but only 1 declared

    let file = single_folder_file(&prop);

    // Out-of-bounds referents stay fatal even in lenient mode.
    let err = rbxl_binary::decode_place(file.as_slice()).unwrap_err();
    assert!(err.to_string().contains("out of bounds"), "got: {}", err);
}

#[test]
fn decompress_produces_equivalent_uncompressed_file() {
    let mut dom = Dom::new();
    dom.metadata_mut()
        .insert("ExplicitAutoJoints".to_owned(), "true".to_owned());

    let mut folder = InstanceBuilder::new("Folder");
    for index in 0..32 {
        folder.add_child(
            InstanceBuilder::new("IntValue")
                .with_name(format!("Value{:02}", index))
                .with_property("Value", index * 3 - 10),
        );
    }
    dom.insert(Ref::none(), folder);

    let mut compressed = Vec::new();
    rbxl_binary::encode_place(&dom, &mut compressed).unwrap();

    let mut decompressed = Vec::new();
    let warnings = rbxl_binary::decompress(compressed.as_slice(), &mut decompressed).unwrap();
    assert_eq!(warnings, Vec::new());

    // Every chunk in the output is stored raw.
    let chunks = raw_chunks(&decompressed);
    assert_eq!(chunks.last().map(|(name, _)| name.as_slice()), Some(&b"END\0"[..]));

    // The data survives untouched.
    let from_compressed = rbxl_binary::decode_place(compressed.as_slice()).unwrap();
    let from_decompressed = rbxl_binary::decode_place(decompressed.as_slice()).unwrap();

    assert_eq!(
        from_compressed.dom.metadata(),
        from_decompressed.dom.metadata()
    );
    assert_eq!(
        from_compressed.dom.root_refs().len(),
        from_decompressed.dom.root_refs().len()
    );

    // Decompressing a second time is the identity.
    let mut again = Vec::new();
    rbxl_binary::decompress(decompressed.as_slice(), &mut again).unwrap();
    assert_eq!(again, decompressed);
}

#[test]
fn dump_writes_valid_json() {
    let mut dom = Dom::new();
    dom.insert(
        Ref::none(),
        InstanceBuilder::new("IntValue").with_property("Value", 42),
    );

    let mut buffer = Vec::new();
    rbxl_binary::encode_model(&dom, &mut buffer).unwrap();

    let mut output = Vec::new();
    let warnings = rbxl_binary::dump(buffer.as_slice(), &mut output).unwrap();
    assert_eq!(warnings, Vec::new());

    let text = String::from_utf8(output).unwrap();
    assert!(text.contains("IntValue"));
    assert!(text.contains("PRNT") || text.contains("Prnt"));

    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert!(parsed.get("chunks").is_some());
}

#[test]
fn container_view_of_encoded_file_is_clean() {
    let mut dom = Dom::new();
    dom.metadata_mut()
        .insert("ExplicitAutoJoints".to_owned(), "true".to_owned());
    dom.insert(
        Ref::none(),
        InstanceBuilder::new("IntValue").with_property("Value", 42),
    );

    let mut buffer = Vec::new();
    rbxl_binary::encode_place(&dom, &mut buffer).unwrap();

    let model = DecodedModel::from_reader(buffer.as_slice()).unwrap();

    assert_eq!(model.reserved, [0; 8]);
    assert_eq!(model.num_types, 1);
    assert_eq!(model.num_instances, 1);
    assert!(model.trailing.is_empty());
    assert_eq!(model.warnings(), Vec::new());

    // META leads, END closes.
    assert!(matches!(model.chunks.first(), Some(DecodedChunk::Meta { .. })));
    assert!(matches!(model.chunks.last(), Some(DecodedChunk::End { .. })));
}

#[test]
fn trailing_bytes_are_reported() {
    let mut file = header(0, 0);
    file.extend(end_chunk());
    file.extend_from_slice(b"extra bytes after the end");

    let model = DecodedModel::from_reader(file.as_slice()).unwrap();
    assert_eq!(model.trailing, b"extra bytes after the end");
    assert!(model
        .warnings()
        .contains(&Warning::TrailingData { length: 25 }));
}
