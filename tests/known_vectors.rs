//! End-to-end derivation checks against published brainwallet vectors.
//!
//! A small multiplication window keeps the table build fast; the derived
//! hash160s must not depend on the window width.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use brainsweep::ecmult::EcmultTable;
use brainsweep::pipeline::{Pipeline, PipelineConfig};
use brainsweep::transform::Transform;

const HORSE_COMPRESSED: &str = "79fbfc3f34e7745860d76137da68f362380c606c";
const HORSE_UNCOMPRESSED: &str = "c4c5d791fcb4654a1ef5e03fe0ad3d9c598f9827";
const ONE_COMPRESSED: &str = "751e76e8199196d454941c45d1b3a323f1433bd6";
const ONE_UNCOMPRESSED: &str = "91b24bf9f5288532960ac687abb035127b1d28a5";

fn run_report_all(transform: Transform, input: &[u8]) -> String {
    let table = Arc::new(EcmultTable::build(4).unwrap());
    let pipeline = Pipeline::new(
        table,
        None,
        PipelineConfig {
            transform,
            threads: 1,
            verbose: false,
        },
    );
    let mut reader = input;
    let mut out = Vec::new();
    let shutdown = AtomicBool::new(false);
    pipeline.run(&mut reader, &mut out, &shutdown).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn passphrase_vector_correct_horse() {
    let out = run_report_all(Transform::Passphrase, b"correct horse battery staple\n");
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[0],
        format!("{}:u:str:correct horse battery staple", HORSE_UNCOMPRESSED)
    );
    assert_eq!(
        lines[1],
        format!("{}:c:str:correct horse battery staple", HORSE_COMPRESSED)
    );
}

#[test]
fn priv_vector_scalar_one() {
    let one = "0000000000000000000000000000000000000000000000000000000000000001";
    let out = run_report_all(Transform::HexPrivKey, format!("{}\n", one).as_bytes());
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(ONE_UNCOMPRESSED));
    assert!(lines[0].contains(":u:priv:"));
    assert!(lines[1].starts_with(ONE_COMPRESSED));
    assert!(lines[1].contains(":c:priv:"));
}

#[test]
fn hex_type_matches_decoded_passphrase() {
    // "hex" candidates are hex renderings of "str" candidates, so the two
    // transforms must produce the same hash160s for equivalent inputs.
    let plain = run_report_all(Transform::Passphrase, b"abc\n");
    let hexed = run_report_all(Transform::HexPassphrase, b"616263\n");
    let digests = |s: &str| -> Vec<String> {
        s.lines().map(|l| l[..40].to_string()).collect()
    };
    assert_eq!(digests(&plain), digests(&hexed));
}

#[test]
fn window_width_does_not_change_derivation() {
    for window in [1u32, 3, 5, 8] {
        let table = Arc::new(EcmultTable::build(window).unwrap());
        let pipeline = Pipeline::new(
            table,
            None,
            PipelineConfig {
                transform: Transform::Passphrase,
                threads: 1,
                verbose: false,
            },
        );
        let mut reader: &[u8] = b"correct horse battery staple\n";
        let mut out = Vec::new();
        let shutdown = AtomicBool::new(false);
        pipeline.run(&mut reader, &mut out, &shutdown).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(
            text.contains(HORSE_COMPRESSED) && text.contains(HORSE_UNCOMPRESSED),
            "window {} derived wrong digests:\n{}",
            window,
            text
        );
    }
}
