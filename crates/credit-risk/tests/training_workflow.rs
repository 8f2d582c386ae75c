use credit_risk::scoring::{ArtifactStore, InferencePipeline, ModelKind, TreeNode};
use credit_risk::training::{
    DatasetProfile, LabeledDataset, Partition, Trainer, TrainingConfig, DEFAULT_SEED,
};
use std::path::PathBuf;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/clients.csv")
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "credit-risk-training-{name}-{}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn fixture_loads_with_duplicates_removed() {
    let dataset = LabeledDataset::from_path(fixture_path()).expect("fixture loads");
    assert_eq!(dataset.len(), 300);
    assert_eq!(dataset.duplicates_dropped(), 3);
    assert!(dataset.default_rate() > 0.3 && dataset.default_rate() < 0.7);
}

#[test]
fn training_produces_usable_models_on_both_partitions() {
    let dataset = LabeledDataset::from_path(fixture_path()).expect("fixture loads");
    let outcome = Trainer::new(TrainingConfig::default())
        .run(&dataset)
        .expect("training succeeds");

    assert_eq!(outcome.test_rows, 90);
    assert_eq!(outcome.train_rows, 210);
    assert_eq!(outcome.evaluations.len(), 4);

    let logistic = outcome
        .evaluation(ModelKind::Logistic, Partition::Test)
        .expect("logistic test report");
    assert!(logistic.auc > 0.85, "logistic test auc {}", logistic.auc);
    assert!(logistic.ks > 0.0 && logistic.ks <= 1.0);

    let tree = outcome
        .evaluation(ModelKind::Tree, Partition::Test)
        .expect("tree test report");
    assert!(tree.auc > 0.6, "tree test auc {}", tree.auc);

    let train = outcome
        .evaluation(ModelKind::Logistic, Partition::Train)
        .expect("logistic train report");
    assert_eq!(outcome.artifact.threshold, train.threshold);
    assert!(outcome.artifact.threshold > 0.0 && outcome.artifact.threshold < 1.0);
}

#[test]
fn tree_respects_leaf_size_on_the_fixture() {
    let dataset = LabeledDataset::from_path(fixture_path()).unwrap();
    let config = TrainingConfig {
        deployed: ModelKind::Tree,
        ..TrainingConfig::default()
    };
    let outcome = Trainer::new(config).run(&dataset).unwrap();

    let tree = match &outcome.artifact.classifier {
        credit_risk::scoring::ClassifierModel::Tree(tree) => tree,
        other => panic!("expected a tree, got {:?}", other.kind()),
    };
    assert!(tree.depth() <= 4);

    fn leaves(node: &TreeNode, out: &mut Vec<usize>) {
        match node {
            TreeNode::Leaf { samples, .. } => out.push(*samples),
            TreeNode::Split { left, right, .. } => {
                leaves(left, out);
                leaves(right, out);
            }
        }
    }
    let mut sizes = Vec::new();
    leaves(tree.root(), &mut sizes);
    assert!(sizes.iter().all(|&size| size >= 75), "leaf sizes {sizes:?}");
    assert_eq!(sizes.iter().sum::<usize>(), outcome.train_rows);
}

#[test]
fn split_is_reproducible_for_a_seed() {
    let dataset = LabeledDataset::from_path(fixture_path()).unwrap();
    let (first, _) = dataset.split(0.3, DEFAULT_SEED).unwrap();
    let (second, _) = dataset.split(0.3, DEFAULT_SEED).unwrap();
    let (other, _) = dataset.split(0.3, DEFAULT_SEED + 1).unwrap();
    assert_eq!(first, second);
    assert_ne!(first, other);
}

#[test]
fn persisted_artifacts_serve_the_same_predictions() {
    let dataset = LabeledDataset::from_path(fixture_path()).unwrap();
    let outcome = Trainer::new(TrainingConfig::default())
        .run(&dataset)
        .unwrap();

    let store = ArtifactStore::new(scratch_dir("persist"));
    outcome.persist(&store).expect("artifacts saved");

    let in_memory = InferencePipeline::new(outcome.encoder.clone(), outcome.artifact.clone());
    let loaded = InferencePipeline::load(store.directory()).expect("artifacts load");
    assert_eq!(loaded.threshold(), in_memory.threshold());

    for record in dataset.records().iter().take(50) {
        assert_eq!(
            loaded.predict(record).unwrap(),
            in_memory.predict(record).unwrap()
        );
    }

    let _ = std::fs::remove_dir_all(store.directory());
}

#[test]
fn profile_covers_every_education_level() {
    let dataset = LabeledDataset::from_path(fixture_path()).unwrap();
    let profile = DatasetProfile::from_dataset(&dataset);
    assert_eq!(profile.rows, 300);
    assert_eq!(profile.categories.len(), 5);
    assert_eq!(
        profile.categories.iter().map(|c| c.count).sum::<usize>(),
        300
    );
    assert_eq!(profile.columns.len(), 7);
}
