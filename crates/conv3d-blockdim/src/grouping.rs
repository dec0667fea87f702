//! Group-convolution accounting.
//!
//! Grouped convolutions either keep every group separate ("original"), or,
//! when the weights are already fractal-packed, merge `enlarge` neighbouring
//! groups into one so that each merged group fills whole `k0`/`n0` fractals
//! ("optimized").

use conv3d_common::{OperandDescriptor, ShapeDescriptor, TileGranularity, align_up, ceil_div};
use serde::Serialize;

/// Which channel counts feed the range builder and the cost model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupingVariant {
    /// `groups == 1`.
    Normal { cin: u64, cout: u64 },
    /// Every group is tiled on its own.
    OriginalGroup { groups: u64, cin_per_group: u64, cout_per_group: u64 },
    /// `enlarge` groups are fused; channel counts are padded to the fractal size.
    OptimizedGroup { enlarge: u64, groups_opt: u64, cin_opt: u64, cout_opt: u64 },
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn lcm(a: u64, b: u64) -> u64 {
    if a == 0 || b == 0 { 0 } else { a / gcd(a, b) * b }
}

impl GroupingVariant {
    /// Pick the variant for a validated shape.
    #[must_use]
    pub fn resolve(
        shape: &ShapeDescriptor,
        groups: u64,
        operands: &OperandDescriptor,
        granularity: TileGranularity,
    ) -> Self {
        if groups <= 1 {
            return Self::Normal { cin: shape.cin, cout: shape.cout };
        }
        let cin_per_group = shape.cin / groups;
        let cout_per_group = shape.cout / groups;
        if !operands.weight_format.is_native() {
            return Self::OriginalGroup { groups, cin_per_group, cout_per_group };
        }

        let TileGranularity { k0, n0, .. } = granularity;
        let cin_factor = lcm(cin_per_group, k0) / cin_per_group.max(1);
        let cout_factor = lcm(cout_per_group, n0) / cout_per_group.max(1);
        let enlarge = lcm(cin_factor, cout_factor).min(groups).max(1);
        Self::OptimizedGroup {
            enlarge,
            groups_opt: ceil_div(groups, enlarge),
            cin_opt: align_up(cin_per_group * enlarge, k0),
            cout_opt: align_up(cout_per_group * enlarge, n0),
        }
    }

    /// Number of independent groups the search partitions over.
    #[must_use]
    pub const fn groups(&self) -> u64 {
        match *self {
            Self::Normal { .. } => 1,
            Self::OriginalGroup { groups, .. } => groups,
            Self::OptimizedGroup { groups_opt, .. } => groups_opt,
        }
    }

    /// Input channels reduced by one group.
    #[must_use]
    pub const fn cin(&self) -> u64 {
        match *self {
            Self::Normal { cin, .. } => cin,
            Self::OriginalGroup { cin_per_group, .. } => cin_per_group,
            Self::OptimizedGroup { cin_opt, .. } => cin_opt,
        }
    }

    /// Output channels produced by one group.
    #[must_use]
    pub const fn cout(&self) -> u64 {
        match *self {
            Self::Normal { cout, .. } => cout,
            Self::OriginalGroup { cout_per_group, .. } => cout_per_group,
            Self::OptimizedGroup { cout_opt, .. } => cout_opt,
        }
    }

    #[must_use]
    pub const fn is_optimized(&self) -> bool {
        matches!(self, Self::OptimizedGroup { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conv3d_common::{AttributeDescriptor, DataType, FeatureMapFormat, Spatial3, WeightFormat};

    fn shape(cin: u64, cout: u64, groups: u64) -> ShapeDescriptor {
        let attrs = AttributeDescriptor { groups, ..AttributeDescriptor::default() };
        ShapeDescriptor::infer(1, cin, Spatial3::splat(8), cout, Spatial3::splat(3), &attrs)
    }

    fn operands(weight_format: WeightFormat) -> OperandDescriptor {
        OperandDescriptor::uniform(DataType::Float16, FeatureMapFormat::Ndc1hwc0, weight_format)
    }

    #[test]
    fn single_group_is_normal() {
        let g = DataType::Float16.granularity();
        let v =
            GroupingVariant::resolve(&shape(32, 64, 1), 1, &operands(WeightFormat::FractalZ3d), g);
        assert_eq!(v, GroupingVariant::Normal { cin: 32, cout: 64 });
        assert_eq!((v.groups(), v.cin(), v.cout()), (1, 32, 64));
    }

    #[test]
    fn dense_weights_keep_original_groups() {
        let g = DataType::Float16.granularity();
        let v = GroupingVariant::resolve(&shape(32, 64, 8), 8, &operands(WeightFormat::Ncdhw), g);
        assert_eq!(
            v,
            GroupingVariant::OriginalGroup { groups: 8, cin_per_group: 4, cout_per_group: 8 }
        );
        assert!(!v.is_optimized());
    }

    #[test]
    fn fractal_weights_enlarge_groups() {
        // 4 in / 8 out channels per group: 4 groups fill a k0 fractal, 2 fill n0.
        let g = DataType::Float16.granularity();
        let v =
            GroupingVariant::resolve(&shape(32, 64, 8), 8, &operands(WeightFormat::FractalZ3d), g);
        assert_eq!(
            v,
            GroupingVariant::OptimizedGroup { enlarge: 4, groups_opt: 2, cin_opt: 16, cout_opt: 32 }
        );
        assert!(v.is_optimized());
    }

    #[test]
    fn enlarge_is_capped_by_group_count() {
        let g = DataType::Float16.granularity();
        let v =
            GroupingVariant::resolve(&shape(2, 2, 2), 2, &operands(WeightFormat::FractalZ3d), g);
        assert_eq!(
            v,
            GroupingVariant::OptimizedGroup { enlarge: 2, groups_opt: 1, cin_opt: 16, cout_opt: 16 }
        );
    }

    #[test]
    fn gcd_lcm() {
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(lcm(4, 16), 16);
        assert_eq!(lcm(0, 16), 0);
    }
}
