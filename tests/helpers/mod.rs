pub mod builders;

pub use builders::{MembershipBuilder, PolicyBuilder, RoleBuilder};
