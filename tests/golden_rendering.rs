use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use yapgen::rendering::fonts::FontStore;
use yapgen::{Composition, RasterRenderer};

fn golden_path(name: &str) -> PathBuf {
    let mut p = PathBuf::from("tests/goldens/expected");
    p.push(name);
    p
}

#[test]
fn golden_background_render_matches_fixture() {
    let renderer = RasterRenderer::new(Arc::new(FontStore::new()));
    let composition = Composition::default();

    let bitmap = renderer.render(&composition).expect("render");
    let digest = hex::encode(Sha256::digest(&bitmap.png_data));

    let expected_path = golden_path("background.img");
    if std::env::var("UPDATE_GOLDENS").is_ok() {
        fs::create_dir_all("tests/goldens/expected").ok();
        fs::write(&expected_path, &digest).expect("write golden");
        println!("Updated golden: {:?}", expected_path);
        return;
    }

    if !expected_path.exists() {
        println!(
            "No golden at {:?}; run with UPDATE_GOLDENS=1 to create it. Skipping.",
            expected_path
        );
        return;
    }

    let expected = fs::read_to_string(&expected_path).expect("unable to read golden");
    assert_eq!(digest, expected.trim());
}

#[test]
fn render_is_deterministic_across_calls() {
    let renderer = RasterRenderer::new(Arc::new(FontStore::new()));
    let composition = Composition::default();

    let a = renderer.render(&composition).expect("first render");
    let b = renderer.render(&composition).expect("second render");
    assert_eq!(
        Sha256::digest(&a.png_data),
        Sha256::digest(&b.png_data),
        "structurally equal input must produce byte-identical output"
    );
}
