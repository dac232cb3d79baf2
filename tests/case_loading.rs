//! End-to-end loading of synthetic MRNet trees.

use mrnetcase::{
    CaseLoader, Error, LoaderConfig, MrnetLoader, OversizePolicy, Partition, Plane,
};
use ndarray::{s, Array3};
use ndarray_npy::write_npy;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

const HEIGHT: usize = 6;
const WIDTH: usize = 5;

/// Writes a `uint8` stack whose slice `k` is filled with `k + 1`.
fn write_stack(root: &Path, partition: &str, plane: &str, case: &str, depth: usize) {
    let dir = root.join(partition).join(plane);
    fs::create_dir_all(&dir).unwrap();
    let stack = Array3::<u8>::from_shape_fn((depth, HEIGHT, WIDTH), |(k, _, _)| (k + 1) as u8);
    write_npy(dir.join(format!("{case}.npy")), &stack).unwrap();
}

fn write_case(root: &Path, partition: &str, case: &str, depths: [usize; 3]) {
    for (plane, depth) in Plane::ALL.iter().zip(depths) {
        write_stack(root, partition, plane.dir_name(), case, depth);
    }
}

fn config(root: &Path) -> LoaderConfig {
    LoaderConfig {
        frame_height: HEIGHT,
        frame_width: WIDTH,
        ..LoaderConfig::new(root)
    }
}

fn dataset() -> TempDir {
    let dir = tempdir().unwrap();
    write_case(dir.path(), "train", "0000", [11, 10, 9]);
    write_case(dir.path(), "train", "0001", [20, 25, 30]);
    write_case(dir.path(), "valid", "1234", [51, 60, 3]);
    dir
}

#[test]
fn bundle_planes_are_padded_to_target_depth() {
    let dir = dataset();
    let loader = MrnetLoader::new(&config(dir.path())).unwrap();
    let bundle = loader.load_case("0000").unwrap();

    assert_eq!(bundle.partition, Partition::Train);
    for plane in Plane::ALL {
        assert_eq!(bundle.plane(plane).dim(), (51, HEIGHT, WIDTH));
    }
    // axial: 11 slices at [20, 31)
    assert_eq!(bundle.axial[[19, 0, 0]], 0.0);
    assert_eq!(bundle.axial[[20, 0, 0]], 1.0);
    assert_eq!(bundle.axial[[30, 0, 0]], 11.0);
    assert_eq!(bundle.axial[[31, 0, 0]], 0.0);
    // coronal: 10 slices at [20, 30)
    assert_eq!(bundle.coronal[[29, 0, 0]], 10.0);
    assert!(bundle.coronal.slice(s![30.., .., ..]).iter().all(|&v| v == 0.0));
}

#[test]
fn center_slices_come_from_the_raw_sagittal_stack() {
    let dir = dataset();
    let loader = MrnetLoader::new(&config(dir.path())).unwrap();
    let bundle = loader.load_case("0000").unwrap();

    // raw sagittal depth 9 -> slices 3, 4, 5
    assert_eq!(bundle.center.dim(), (3, HEIGHT, WIDTH));
    let firsts: Vec<f64> = bundle.center.outer_iter().map(|s| s[[0, 0]]).collect();
    assert_eq!(firsts, vec![4.0, 5.0, 6.0]);
}

#[test]
fn valid_case_resolves_under_valid() {
    let dir = dataset();
    let loader = MrnetLoader::new(&config(dir.path())).unwrap();
    let paths = loader.resolve("1234").unwrap();
    assert_eq!(paths.partition, Partition::Valid);
    assert_eq!(
        paths.sagittal,
        dir.path().join("valid").join("sagittal").join("1234.npy")
    );

    let bundle = loader.load_case("1234").unwrap();
    assert_eq!(bundle.axial.dim().0, 51);
    // oversized stacks pass through by default
    assert_eq!(bundle.coronal.dim().0, 60);
    assert_eq!(bundle.center.dim().0, 3);
}

#[test]
fn truncate_policy_caps_oversized_stacks() {
    let dir = dataset();
    let cfg = LoaderConfig {
        oversize: OversizePolicy::Truncate,
        ..config(dir.path())
    };
    let bundle = MrnetLoader::new(&cfg).unwrap().load_case("1234").unwrap();
    assert_eq!(bundle.coronal.dim().0, 51);
    // (60 - 51) / 2 = 4 slices dropped in front
    assert_eq!(bundle.coronal[[0, 0, 0]], 5.0);
}

#[test]
fn case_ids_are_deduplicated_across_partitions() {
    let dir = dataset();
    write_stack(dir.path(), "valid", "axial", "0000", 4);
    let loader = MrnetLoader::new(&config(dir.path())).unwrap();
    let ids: Vec<String> = loader.locator().list_case_ids().unwrap().into_iter().collect();
    assert_eq!(ids, vec!["0000", "0001", "1234"]);

    let valid = loader.locator().list_partition(Partition::Valid).unwrap();
    assert_eq!(valid.len(), 2);
}

#[test]
fn strict_mode_catches_split_case() {
    let dir = dataset();
    write_stack(dir.path(), "train", "axial", "0042", 12);
    write_stack(dir.path(), "valid", "coronal", "0042", 12);
    write_stack(dir.path(), "train", "sagittal", "0042", 12);

    // lenient resolution trusts the axial lookup and fails only when reading
    let lenient = MrnetLoader::new(&config(dir.path())).unwrap();
    let paths = lenient.resolve("0042").unwrap();
    assert_eq!(paths.partition, Partition::Train);
    match lenient.load_case("0042").unwrap_err() {
        Error::Case { case_id, plane, .. } => {
            assert_eq!(case_id, "0042");
            assert_eq!(plane, Some(Plane::Coronal));
        }
        other => panic!("unexpected error {other}"),
    }

    let cfg = LoaderConfig {
        strict_partitions: true,
        ..config(dir.path())
    };
    let strict = MrnetLoader::new(&cfg).unwrap();
    match strict.resolve("0042").unwrap_err() {
        Error::PartitionMismatch {
            plane,
            expected,
            found,
            ..
        } => {
            assert_eq!(plane, Plane::Coronal);
            assert_eq!(expected, Partition::Train);
            assert_eq!(found, Partition::Valid);
        }
        other => panic!("unexpected error {other}"),
    }
    assert!(strict.resolve("0001").is_ok());
}

#[test]
fn shallow_sagittal_stack_is_an_input_error() {
    let dir = dataset();
    write_case(dir.path(), "train", "0007", [11, 11, 2]);
    let loader = MrnetLoader::new(&config(dir.path())).unwrap();
    let err = loader.load_case("0007").unwrap_err();
    assert!(matches!(
        err.root(),
        Error::InsufficientDepth {
            required: 3,
            actual: 2
        }
    ));
    assert!(err.to_string().contains("0007 (sagittal)"));
}

#[test]
fn wrong_frame_is_reported_with_case_and_plane() {
    let dir = dataset();
    let cfg = LoaderConfig {
        frame_height: 256,
        frame_width: 256,
        ..LoaderConfig::new(dir.path())
    };
    let err = MrnetLoader::new(&cfg).unwrap().load_case("0001").unwrap_err();
    match err {
        Error::Case { plane, source, .. } => {
            assert_eq!(plane, Some(Plane::Sagittal));
            assert!(matches!(
                *source,
                Error::ShapeMismatch {
                    actual: (30, HEIGHT, WIDTH),
                    ..
                }
            ));
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn batch_loading_keeps_input_order() {
    let dir = dataset();
    let loader = MrnetLoader::new(&config(dir.path())).unwrap();
    let results = loader.load_cases(&["1234", "missing", "0000"]);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().case_id, "1234");
    assert!(matches!(results[1], Err(Error::NotFound { .. })));
    assert_eq!(results[2].as_ref().unwrap().case_id, "0000");
}

#[test]
fn model_input_replicates_rescaled_slices() {
    let dir = dataset();
    let loader = MrnetLoader::new(&config(dir.path())).unwrap();
    let bundle = loader.load_case("0001").unwrap();
    let input = loader.model_input(&bundle, Plane::Axial).unwrap();
    assert_eq!(input.dim(), (51, 3, HEIGHT, WIDTH));
    // axial depth 20 sits at [15, 35)
    for c in 0..3 {
        assert_eq!(input[[15, c, 2, 2]], 1.0 / 255.0);
        assert_eq!(input[[14, c, 2, 2]], 0.0);
    }
}

#[test]
fn config_file_drives_the_loader() {
    let dir = dataset();
    let cfg_path = dir.path().join("loader.yaml");
    let yaml = format!(
        "root: {}\nframe_height: {HEIGHT}\nframe_width: {WIDTH}\ntarget_depth: 32\n",
        dir.path().display()
    );
    fs::write(&cfg_path, yaml).unwrap();

    let cfg = LoaderConfig::from_yaml_file(&cfg_path).unwrap();
    let bundle = MrnetLoader::new(&cfg).unwrap().load_case("0000").unwrap();
    assert_eq!(bundle.sagittal.dim().0, 32);
    // the yaml file itself is not a case
    let ids = MrnetLoader::new(&cfg).unwrap().locator().list_case_ids().unwrap();
    assert_eq!(ids.len(), 3);
}
