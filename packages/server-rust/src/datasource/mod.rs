//! Datasource resolution: the descriptor table, tile templates, and the
//! factory that binds layergroups to concrete tile sources.

pub mod descriptor;
pub mod factory;
pub mod template;

pub use descriptor::{DatasourceDescriptor, DatasourceTable};
pub use factory::{DatasourceFactory, DatasourceHandler};
pub use template::{encode_layer_names, TileLocation, TileTemplate};
