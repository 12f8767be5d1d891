pub const TEST_NAMESPACE: &str = "test";
pub const TEST_DEPLOYMENT: &str = "the-deployment";
pub const TEST_SECRET: &str = "the-secret";
pub const TEST_FIELD_MANAGER: &str = "applier";
pub const TEST_OWNER_GROUP: &str = "applier.dev";
