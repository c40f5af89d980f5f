// Management endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

// Environment variables
pub const ENV_ARM_ENDPOINT: &str = "ARM_ENDPOINT";
pub const ENV_ARM_SUBSCRIPTION_ID: &str = "ARM_SUBSCRIPTION_ID";
pub const ENV_ARM_ACCESS_TOKEN: &str = "ARM_ACCESS_TOKEN";

// Resource types and the management API versions used to talk to them
pub const CONTAINER_GROUP_RESOURCE_TYPE: &str = "Microsoft.ContainerInstance/containerGroups";
pub const CONTAINER_GROUP_API_VERSION: &str = "2018-04-01";
pub const CONTAINER_SERVICE_RESOURCE_TYPE: &str = "Microsoft.ContainerService/containerServices";
pub const CONTAINER_SERVICE_API_VERSION: &str = "2017-07-01";

/// The subscription used by the in-memory client when none is given.
pub const SIMULATED_SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";
