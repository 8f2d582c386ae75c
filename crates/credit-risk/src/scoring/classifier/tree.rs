use serde::{Deserialize, Serialize};

use super::{validate_training_set, Classifier, ClassifierError};
use crate::scoring::schema::{FeatureVector, FEATURE_COUNT};

/// Growth limits for [`DecisionTreeModel::fit`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeSettings {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            max_depth: 4,
            min_samples_leaf: 75,
        }
    }
}

/// Node of a fitted tree. Rows with `feature <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
    Leaf {
        /// Share of defaulters among the training rows in this leaf.
        positive_rate: f64,
        samples: usize,
    },
}

impl TreeNode {
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn leaf(labels: &[u8], indices: &[usize]) -> Self {
        let positives = indices.iter().filter(|&&index| labels[index] == 1).count();
        TreeNode::Leaf {
            positive_rate: positives as f64 / indices.len() as f64,
            samples: indices.len(),
        }
    }
}

/// Gini-impurity decision tree whose leaves carry default probabilities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeModel {
    root: TreeNode,
}

impl DecisionTreeModel {
    pub fn from_root(root: TreeNode) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }

    pub fn fit(
        features: &[FeatureVector],
        labels: &[u8],
        settings: &TreeSettings,
    ) -> Result<Self, ClassifierError> {
        validate_training_set(features, labels)?;
        let indices: Vec<usize> = (0..features.len()).collect();
        let min_leaf = settings.min_samples_leaf.max(1);
        let root = grow(features, labels, &indices, 0, settings.max_depth, min_leaf);
        Ok(Self { root })
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        validate_node(&self.root)
    }
}

impl Classifier for DecisionTreeModel {
    fn positive_probability(&self, features: &FeatureVector) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { positive_rate, .. } => return *positive_rate,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let goes_left = features
                        .get(*feature)
                        .map(|value| value <= *threshold)
                        .unwrap_or(false);
                    node = if goes_left { left } else { right };
                }
            }
        }
    }
}

fn validate_node(node: &TreeNode) -> Result<(), String> {
    match node {
        TreeNode::Leaf { positive_rate, .. } => {
            if (0.0..=1.0).contains(positive_rate) {
                Ok(())
            } else {
                Err(format!("leaf probability {positive_rate} outside [0, 1]"))
            }
        }
        TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if *feature >= FEATURE_COUNT {
                return Err(format!("split on unknown feature index {feature}"));
            }
            if !threshold.is_finite() {
                return Err("split threshold must be finite".to_string());
            }
            validate_node(left)?;
            validate_node(right)
        }
    }
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn grow(
    features: &[FeatureVector],
    labels: &[u8],
    indices: &[usize],
    depth: usize,
    max_depth: usize,
    min_leaf: usize,
) -> TreeNode {
    let total = indices.len();
    let positives = indices.iter().filter(|&&index| labels[index] == 1).count();

    if depth >= max_depth || positives == 0 || positives == total || total < 2 * min_leaf {
        return TreeNode::leaf(labels, indices);
    }

    let parent_impurity = gini(positives, total);
    let Some(best) = best_split(features, labels, indices, min_leaf) else {
        return TreeNode::leaf(labels, indices);
    };
    if parent_impurity - best.impurity <= 1e-12 {
        return TreeNode::leaf(labels, indices);
    }

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&index| features[index].0[best.feature] <= best.threshold);

    TreeNode::Split {
        feature: best.feature,
        threshold: best.threshold,
        left: Box::new(grow(features, labels, &left, depth + 1, max_depth, min_leaf)),
        right: Box::new(grow(features, labels, &right, depth + 1, max_depth, min_leaf)),
    }
}

/// Lowest weighted-Gini split that leaves at least `min_leaf` rows on each side.
fn best_split(
    features: &[FeatureVector],
    labels: &[u8],
    indices: &[usize],
    min_leaf: usize,
) -> Option<SplitCandidate> {
    let total = indices.len();
    let total_positives = indices.iter().filter(|&&index| labels[index] == 1).count();
    let mut best: Option<SplitCandidate> = None;

    for feature in 0..FEATURE_COUNT {
        let mut column: Vec<(f64, u8)> = indices
            .iter()
            .map(|&index| (features[index].0[feature], labels[index]))
            .collect();
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_positives = 0;
        for position in 0..total - 1 {
            left_positives += usize::from(column[position].1);
            let left_count = position + 1;
            let right_count = total - left_count;

            if column[position].0 == column[position + 1].0 {
                continue;
            }
            if left_count < min_leaf || right_count < min_leaf {
                continue;
            }

            let impurity = (left_count as f64 * gini(left_positives, left_count)
                + right_count as f64 * gini(total_positives - left_positives, right_count))
                / total as f64;

            if best.as_ref().map_or(true, |current| impurity < current.impurity) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: split_threshold(column[position].0, column[position + 1].0),
                    impurity,
                });
            }
        }
    }

    best
}

/// Midpoint of two adjacent distinct values. Falls back to `lower` when the
/// midpoint rounds onto `upper`, so every split keeps rows on both sides.
fn split_threshold(lower: f64, upper: f64) -> f64 {
    let midpoint = lower / 2.0 + upper / 2.0;
    if midpoint.is_finite() && midpoint < upper {
        midpoint
    } else {
        lower
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(income: f64, debt: f64) -> FeatureVector {
        FeatureVector([40.0, 0.3, 10.0, income, debt, 0.5, 0.5, debt / income])
    }

    #[test]
    fn fit_splits_on_the_informative_feature() {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            features.push(row(100.0 + i as f64, 1.0));
            labels.push(0);
            features.push(row(100.0 + i as f64, 9.0));
            labels.push(1);
        }

        let settings = TreeSettings {
            max_depth: 3,
            min_samples_leaf: 5,
        };
        let model = DecisionTreeModel::fit(&features, &labels, &settings).expect("tree fits");

        match model.root() {
            TreeNode::Split {
                feature, threshold, ..
            } => {
                assert!(*feature == 4 || *feature == 7, "split on feature {feature}");
                assert!(*threshold > 0.0);
            }
            TreeNode::Leaf { .. } => panic!("expected a split at the root"),
        }
        assert_eq!(model.positive_probability(&row(110.0, 9.0)), 1.0);
        assert_eq!(model.positive_probability(&row(110.0, 1.0)), 0.0);
        assert_eq!(model.depth(), 1);
    }

    #[test]
    fn min_samples_leaf_limits_growth() {
        let features: Vec<FeatureVector> = (0..10).map(|i| row(50.0, i as f64)).collect();
        let labels: Vec<u8> = (0..10).map(|i| u8::from(i >= 5)).collect();
        let settings = TreeSettings {
            max_depth: 4,
            min_samples_leaf: 6,
        };
        let model = DecisionTreeModel::fit(&features, &labels, &settings).unwrap();
        assert_eq!(model.depth(), 0);
        assert_eq!(model.positive_probability(&row(50.0, 9.0)), 0.5);
    }

    #[test]
    fn max_depth_is_respected() {
        let features: Vec<FeatureVector> = (0..64).map(|i| row(50.0 + i as f64, i as f64)).collect();
        let labels: Vec<u8> = (0..64).map(|i| u8::from(i % 4 == 1 || i % 4 == 2)).collect();
        let settings = TreeSettings {
            max_depth: 2,
            min_samples_leaf: 1,
        };
        let model = DecisionTreeModel::fit(&features, &labels, &settings).unwrap();
        assert!(model.depth() <= 2);
    }

    #[test]
    fn adjacent_floats_split_without_an_empty_leaf() {
        let low = 1.0 + f64::EPSILON;
        let high = 1.0 + 2.0 * f64::EPSILON;
        let column = |value: f64| FeatureVector([value, 0.3, 10.0, 50.0, 1.0, 0.5, 0.5, 0.02]);
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..5 {
            features.push(column(low));
            labels.push(0);
            features.push(column(high));
            labels.push(1);
        }

        let settings = TreeSettings {
            max_depth: 1,
            min_samples_leaf: 1,
        };
        let model = DecisionTreeModel::fit(&features, &labels, &settings).expect("tree fits");

        match model.root() {
            TreeNode::Split {
                threshold,
                left,
                right,
                ..
            } => {
                assert_eq!(*threshold, low);
                assert!(matches!(**left, TreeNode::Leaf { samples: 5, .. }));
                assert!(matches!(**right, TreeNode::Leaf { samples: 5, .. }));
            }
            TreeNode::Leaf { .. } => panic!("expected a split at the root"),
        }
        assert!(model.validate().is_ok());
        assert_eq!(model.positive_probability(&column(low)), 0.0);
        assert_eq!(model.positive_probability(&column(high)), 1.0);
    }

    #[test]
    fn split_threshold_stays_below_the_upper_value() {
        assert_eq!(split_threshold(1.0, 3.0), 2.0);
        let huge = split_threshold(f64::MAX / 2.0, f64::MAX);
        assert!(huge.is_finite() && huge > f64::MAX / 2.0 && huge < f64::MAX);
        let low = 1.0 + f64::EPSILON;
        assert_eq!(split_threshold(low, 1.0 + 2.0 * f64::EPSILON), low);
        assert_eq!(split_threshold(-f64::MAX, f64::MAX), 0.0);
    }

    #[test]
    fn validation_rejects_out_of_range_nodes() {
        let bad_feature = DecisionTreeModel::from_root(TreeNode::Split {
            feature: FEATURE_COUNT,
            threshold: 1.0,
            left: Box::new(TreeNode::Leaf {
                positive_rate: 0.1,
                samples: 3,
            }),
            right: Box::new(TreeNode::Leaf {
                positive_rate: 0.9,
                samples: 3,
            }),
        });
        assert!(bad_feature.validate().is_err());

        let bad_leaf = DecisionTreeModel::from_root(TreeNode::Leaf {
            positive_rate: 1.5,
            samples: 1,
        });
        assert!(bad_leaf.validate().is_err());
    }
}
