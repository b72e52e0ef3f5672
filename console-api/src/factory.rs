use std::sync::Arc;

use crate::error::Result;
use crate::rest::RestResourceApi;
use crate::traits::ResourceApi;
use crate::types::{ApiConfig, ResourceEndpoint};

/// Create a [`ResourceApi`] for one collection of a REST service.
pub fn create_resource_api(
    config: &ApiConfig,
    endpoint: ResourceEndpoint,
) -> Result<Arc<dyn ResourceApi>> {
    Ok(Arc::new(RestResourceApi::new(config, endpoint)?))
}
