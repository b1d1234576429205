
pub(crate) use features::{encode, feature_type, point_feature};
