//! 外部协作方：资源库、可信机构名单、已知地点表

pub mod geo;
pub mod registry;
pub mod repository;

pub use geo::{haversine_km, Coordinates, KnownLocations, NamedLocation, EARTH_RADIUS_KM};
pub use registry::{OrganizationRegistry, TrustedOrganizations};
pub use repository::{
    CsvResourceRepository, InMemoryRepository, ResourceRecord, ResourceRepository,
};
