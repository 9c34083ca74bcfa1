//! Record types, one module per entity family.
//!
//! Accessors that cross families (e.g. `Url::credentials`) live next to the
//! record type they return.

#[macro_use]
mod macros;

pub mod address;
pub mod name_pools;

pub mod host_name;
pub mod ip_address;
pub mod mac_address;
pub mod port;
pub mod open_port;
pub mod asn;
pub mod arch;
pub mod os;
pub mod software;

pub mod email_address;
pub mod password;
pub mod credential;

pub mod cert_org;
pub mod cert;
pub mod url;
pub mod http;

pub mod phone_number;
pub mod street_address;
pub mod person;
pub mod organization;

pub mod advisory;
pub mod vulnerability;
pub mod web_vuln;
pub mod note;
