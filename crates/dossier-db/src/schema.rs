//! Database schema definitions, one pair of scripts per migration.
//!
//! Natural keys over nullable columns use expression indexes on
//! `IFNULL(col, '')` / `IFNULL(col, 0)` so that two rows differing only in
//! which optional column is NULL still collide.

pub const NAME_POOLS_UP: &str = r#"
CREATE TABLE dossier_user_names (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_services (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_software_vendors (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_url_schemes (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_http_header_names (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_http_query_param_names (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_url_query_param_names (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_cert_names (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);
"#;

pub const NAME_POOLS_DOWN: &str = r#"
DROP TABLE dossier_cert_names;
DROP TABLE dossier_url_query_param_names;
DROP TABLE dossier_http_query_param_names;
DROP TABLE dossier_http_header_names;
DROP TABLE dossier_url_schemes;
DROP TABLE dossier_software_vendors;
DROP TABLE dossier_services;
DROP TABLE dossier_user_names;
"#;

pub const NETWORK_UP: &str = r#"
CREATE TABLE dossier_ip_addresses (
    id INTEGER PRIMARY KEY,
    address TEXT NOT NULL UNIQUE,
    version INTEGER NOT NULL CHECK (version IN (4, 6)),
    hton BLOB NOT NULL,
    last_scanned_at TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX dossier_ip_addresses_hton ON dossier_ip_addresses (version, hton);

CREATE TABLE dossier_mac_addresses (
    id INTEGER PRIMARY KEY,
    address TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_ip_address_mac_addresses (
    id INTEGER PRIMARY KEY,
    ip_address_id INTEGER NOT NULL REFERENCES dossier_ip_addresses (id) ON DELETE CASCADE,
    mac_address_id INTEGER NOT NULL REFERENCES dossier_mac_addresses (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (ip_address_id, mac_address_id)
);

CREATE TABLE dossier_host_names (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    last_scanned_at TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_host_name_ip_addresses (
    id INTEGER PRIMARY KEY,
    host_name_id INTEGER NOT NULL REFERENCES dossier_host_names (id) ON DELETE CASCADE,
    ip_address_id INTEGER NOT NULL REFERENCES dossier_ip_addresses (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (host_name_id, ip_address_id)
);

CREATE TABLE dossier_ports (
    id INTEGER PRIMARY KEY,
    protocol TEXT NOT NULL CHECK (protocol IN ('tcp', 'udp')),
    number INTEGER NOT NULL CHECK (number BETWEEN 1 AND 65535),
    created_at TEXT NOT NULL,
    UNIQUE (protocol, number)
);

CREATE TABLE dossier_asns (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL CHECK (version IN (4, 6)),
    range_start TEXT NOT NULL,
    range_end TEXT NOT NULL,
    range_start_hton BLOB NOT NULL,
    range_end_hton BLOB NOT NULL,
    number INTEGER NOT NULL,
    country_code TEXT,
    name TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (range_start, range_end, number)
);
CREATE INDEX dossier_asns_range ON dossier_asns (version, range_start_hton, range_end_hton);

CREATE TABLE dossier_arches (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    endian TEXT NOT NULL CHECK (endian IN ('little', 'big')),
    word_size INTEGER NOT NULL CHECK (word_size IN (4, 8)),
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_oses (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    flavor TEXT CHECK (flavor IN ('linux', 'bsd')),
    version TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (name, version)
);

CREATE TABLE dossier_os_guesses (
    id INTEGER PRIMARY KEY,
    ip_address_id INTEGER NOT NULL REFERENCES dossier_ip_addresses (id) ON DELETE CASCADE,
    os_id INTEGER NOT NULL REFERENCES dossier_oses (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (ip_address_id, os_id)
);

CREATE TABLE dossier_softwares (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    version TEXT NOT NULL,
    vendor_id INTEGER REFERENCES dossier_software_vendors (id) ON DELETE SET NULL,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX dossier_softwares_key
    ON dossier_softwares (name, version, IFNULL(vendor_id, 0));

CREATE TABLE dossier_cert_issuers (
    id INTEGER PRIMARY KEY,
    common_name TEXT,
    email_address TEXT,
    organization TEXT,
    organizational_unit TEXT,
    locality TEXT,
    state TEXT,
    country TEXT,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX dossier_cert_issuers_key ON dossier_cert_issuers (
    IFNULL(common_name, ''), IFNULL(email_address, ''), IFNULL(organization, ''),
    IFNULL(organizational_unit, ''), IFNULL(locality, ''), IFNULL(state, ''),
    IFNULL(country, '')
);

CREATE TABLE dossier_cert_subjects (
    id INTEGER PRIMARY KEY,
    common_name_id INTEGER REFERENCES dossier_cert_names (id),
    email_address TEXT,
    organization TEXT,
    organizational_unit TEXT,
    locality TEXT,
    state TEXT,
    country TEXT,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX dossier_cert_subjects_key ON dossier_cert_subjects (
    IFNULL(common_name_id, 0), IFNULL(email_address, ''), IFNULL(organization, ''),
    IFNULL(organizational_unit, ''), IFNULL(locality, ''), IFNULL(state, ''),
    IFNULL(country, '')
);

CREATE TABLE dossier_certs (
    id INTEGER PRIMARY KEY,
    serial TEXT NOT NULL,
    version INTEGER NOT NULL CHECK (version BETWEEN 1 AND 3),
    not_before TEXT NOT NULL,
    not_after TEXT NOT NULL,
    issuer_id INTEGER REFERENCES dossier_cert_issuers (id),
    subject_id INTEGER NOT NULL REFERENCES dossier_cert_subjects (id),
    public_key_algorithm TEXT NOT NULL CHECK (public_key_algorithm IN ('rsa', 'dsa', 'dh', 'ec')),
    public_key_size INTEGER NOT NULL,
    signing_algorithm TEXT NOT NULL,
    sha1_fingerprint TEXT NOT NULL UNIQUE,
    sha256_fingerprint TEXT NOT NULL UNIQUE,
    pem TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_cert_subject_alt_names (
    id INTEGER PRIMARY KEY,
    name_id INTEGER NOT NULL REFERENCES dossier_cert_names (id),
    cert_id INTEGER NOT NULL REFERENCES dossier_certs (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (cert_id, name_id)
);

CREATE TABLE dossier_open_ports (
    id INTEGER PRIMARY KEY,
    ip_address_id INTEGER NOT NULL REFERENCES dossier_ip_addresses (id) ON DELETE CASCADE,
    port_id INTEGER NOT NULL REFERENCES dossier_ports (id) ON DELETE CASCADE,
    service_id INTEGER REFERENCES dossier_services (id) ON DELETE SET NULL,
    software_id INTEGER REFERENCES dossier_softwares (id) ON DELETE SET NULL,
    cert_id INTEGER REFERENCES dossier_certs (id) ON DELETE SET NULL,
    last_scanned_at TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (ip_address_id, port_id)
);
"#;

pub const NETWORK_DOWN: &str = r#"
DROP TABLE dossier_open_ports;
DROP TABLE dossier_cert_subject_alt_names;
DROP TABLE dossier_certs;
DROP TABLE dossier_cert_subjects;
DROP TABLE dossier_cert_issuers;
DROP TABLE dossier_softwares;
DROP TABLE dossier_os_guesses;
DROP TABLE dossier_oses;
DROP TABLE dossier_arches;
DROP TABLE dossier_asns;
DROP TABLE dossier_ports;
DROP TABLE dossier_host_name_ip_addresses;
DROP TABLE dossier_host_names;
DROP TABLE dossier_ip_address_mac_addresses;
DROP TABLE dossier_mac_addresses;
DROP TABLE dossier_ip_addresses;
"#;

pub const WEB_UP: &str = r#"
CREATE TABLE dossier_email_addresses (
    id INTEGER PRIMARY KEY,
    address TEXT NOT NULL UNIQUE,
    user_name_id INTEGER NOT NULL REFERENCES dossier_user_names (id) ON DELETE CASCADE,
    host_name_id INTEGER NOT NULL REFERENCES dossier_host_names (id) ON DELETE CASCADE,
    ip_address_id INTEGER REFERENCES dossier_ip_addresses (id) ON DELETE SET NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_passwords (
    id INTEGER PRIMARY KEY,
    plain_text TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_credentials (
    id INTEGER PRIMARY KEY,
    user_name_id INTEGER REFERENCES dossier_user_names (id) ON DELETE CASCADE,
    email_address_id INTEGER REFERENCES dossier_email_addresses (id) ON DELETE CASCADE,
    password_id INTEGER NOT NULL REFERENCES dossier_passwords (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    CHECK ((user_name_id IS NULL) <> (email_address_id IS NULL))
);
CREATE UNIQUE INDEX dossier_credentials_key ON dossier_credentials (
    IFNULL(user_name_id, 0), IFNULL(email_address_id, 0), password_id
);

CREATE TABLE dossier_urls (
    id INTEGER PRIMARY KEY,
    scheme_id INTEGER NOT NULL REFERENCES dossier_url_schemes (id),
    host_name_id INTEGER NOT NULL REFERENCES dossier_host_names (id) ON DELETE CASCADE,
    port_id INTEGER REFERENCES dossier_ports (id) ON DELETE SET NULL,
    path TEXT NOT NULL,
    query TEXT,
    fragment TEXT,
    last_scanned_at TEXT,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX dossier_urls_key ON dossier_urls (
    scheme_id, host_name_id, IFNULL(port_id, 0), path, IFNULL(query, ''), IFNULL(fragment, '')
);

CREATE TABLE dossier_url_query_params (
    id INTEGER PRIMARY KEY,
    name_id INTEGER NOT NULL REFERENCES dossier_url_query_param_names (id),
    url_id INTEGER NOT NULL REFERENCES dossier_urls (id) ON DELETE CASCADE,
    value TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    UNIQUE (url_id, name_id)
);

CREATE TABLE dossier_service_credentials (
    id INTEGER PRIMARY KEY,
    credential_id INTEGER NOT NULL REFERENCES dossier_credentials (id) ON DELETE CASCADE,
    open_port_id INTEGER NOT NULL REFERENCES dossier_open_ports (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (credential_id, open_port_id)
);

CREATE TABLE dossier_web_credentials (
    id INTEGER PRIMARY KEY,
    credential_id INTEGER NOT NULL REFERENCES dossier_credentials (id) ON DELETE CASCADE,
    url_id INTEGER NOT NULL REFERENCES dossier_urls (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (credential_id, url_id)
);

CREATE TABLE dossier_http_requests (
    id INTEGER PRIMARY KEY,
    version TEXT NOT NULL CHECK (version IN ('1.0', '1.1', '2.0')),
    request_method TEXT NOT NULL,
    path TEXT NOT NULL,
    query TEXT,
    body TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_http_request_headers (
    id INTEGER PRIMARY KEY,
    name_id INTEGER NOT NULL REFERENCES dossier_http_header_names (id),
    value TEXT NOT NULL,
    request_id INTEGER NOT NULL REFERENCES dossier_http_requests (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_http_query_params (
    id INTEGER PRIMARY KEY,
    name_id INTEGER NOT NULL REFERENCES dossier_http_query_param_names (id),
    value TEXT NOT NULL DEFAULT '',
    request_id INTEGER NOT NULL REFERENCES dossier_http_requests (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_http_responses (
    id INTEGER PRIMARY KEY,
    status INTEGER NOT NULL CHECK (status BETWEEN 100 AND 599),
    body TEXT,
    request_id INTEGER NOT NULL UNIQUE REFERENCES dossier_http_requests (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_http_response_headers (
    id INTEGER PRIMARY KEY,
    name_id INTEGER NOT NULL REFERENCES dossier_http_header_names (id),
    value TEXT NOT NULL,
    response_id INTEGER NOT NULL REFERENCES dossier_http_responses (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);
"#;

pub const WEB_DOWN: &str = r#"
DROP TABLE dossier_http_response_headers;
DROP TABLE dossier_http_responses;
DROP TABLE dossier_http_query_params;
DROP TABLE dossier_http_request_headers;
DROP TABLE dossier_http_requests;
DROP TABLE dossier_web_credentials;
DROP TABLE dossier_service_credentials;
DROP TABLE dossier_url_query_params;
DROP TABLE dossier_urls;
DROP TABLE dossier_credentials;
DROP TABLE dossier_passwords;
DROP TABLE dossier_email_addresses;
"#;

pub const PEOPLE_UP: &str = r#"
CREATE TABLE dossier_phone_numbers (
    id INTEGER PRIMARY KEY,
    number TEXT NOT NULL UNIQUE,
    country_code TEXT,
    area_code TEXT,
    prefix TEXT NOT NULL,
    line_number TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_street_addresses (
    id INTEGER PRIMARY KEY,
    address TEXT NOT NULL,
    city TEXT NOT NULL,
    state TEXT,
    zipcode TEXT,
    country TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE UNIQUE INDEX dossier_street_addresses_key ON dossier_street_addresses (
    address, city, IFNULL(state, ''), IFNULL(zipcode, ''), country
);

CREATE TABLE dossier_people (
    id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL UNIQUE,
    prefix TEXT,
    first_name TEXT NOT NULL,
    middle_name TEXT,
    middle_initial TEXT,
    last_name TEXT,
    suffix TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_personal_connections (
    id INTEGER PRIMARY KEY,
    source_person_id INTEGER NOT NULL REFERENCES dossier_people (id) ON DELETE CASCADE,
    destination_person_id INTEGER NOT NULL REFERENCES dossier_people (id) ON DELETE CASCADE,
    type TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (source_person_id, destination_person_id),
    CHECK (source_person_id <> destination_person_id)
);

CREATE TABLE dossier_personal_email_addresses (
    id INTEGER PRIMARY KEY,
    person_id INTEGER NOT NULL REFERENCES dossier_people (id) ON DELETE CASCADE,
    email_address_id INTEGER NOT NULL REFERENCES dossier_email_addresses (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (person_id, email_address_id)
);

CREATE TABLE dossier_personal_phone_numbers (
    id INTEGER PRIMARY KEY,
    type TEXT,
    person_id INTEGER NOT NULL REFERENCES dossier_people (id) ON DELETE CASCADE,
    phone_number_id INTEGER NOT NULL REFERENCES dossier_phone_numbers (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (person_id, phone_number_id)
);

CREATE TABLE dossier_personal_street_addresses (
    id INTEGER PRIMARY KEY,
    type TEXT,
    person_id INTEGER NOT NULL REFERENCES dossier_people (id) ON DELETE CASCADE,
    street_address_id INTEGER NOT NULL REFERENCES dossier_street_addresses (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (person_id, street_address_id)
);

CREATE TABLE dossier_organizations (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    type TEXT,
    parent_id INTEGER REFERENCES dossier_organizations (id) ON DELETE SET NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_organization_departments (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    organization_id INTEGER NOT NULL REFERENCES dossier_organizations (id) ON DELETE CASCADE,
    parent_department_id INTEGER REFERENCES dossier_organization_departments (id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    UNIQUE (organization_id, name)
);

CREATE TABLE dossier_organization_members (
    id INTEGER PRIMARY KEY,
    organization_id INTEGER NOT NULL REFERENCES dossier_organizations (id) ON DELETE CASCADE,
    person_id INTEGER NOT NULL REFERENCES dossier_people (id) ON DELETE CASCADE,
    active INTEGER NOT NULL DEFAULT 1,
    title TEXT,
    rank TEXT,
    department_id INTEGER REFERENCES dossier_organization_departments (id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    UNIQUE (organization_id, person_id)
);

CREATE TABLE dossier_organization_customers (
    id INTEGER PRIMARY KEY,
    organization_id INTEGER NOT NULL REFERENCES dossier_organizations (id) ON DELETE CASCADE,
    customer_organization_id INTEGER REFERENCES dossier_organizations (id) ON DELETE CASCADE,
    customer_person_id INTEGER REFERENCES dossier_people (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    CHECK ((customer_organization_id IS NULL) <> (customer_person_id IS NULL))
);
CREATE UNIQUE INDEX dossier_organization_customers_key ON dossier_organization_customers (
    organization_id, IFNULL(customer_organization_id, 0), IFNULL(customer_person_id, 0)
);

CREATE TABLE dossier_organization_email_addresses (
    id INTEGER PRIMARY KEY,
    organization_id INTEGER NOT NULL REFERENCES dossier_organizations (id) ON DELETE CASCADE,
    email_address_id INTEGER NOT NULL REFERENCES dossier_email_addresses (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (organization_id, email_address_id)
);

CREATE TABLE dossier_organization_phone_numbers (
    id INTEGER PRIMARY KEY,
    type TEXT,
    organization_id INTEGER NOT NULL REFERENCES dossier_organizations (id) ON DELETE CASCADE,
    phone_number_id INTEGER NOT NULL REFERENCES dossier_phone_numbers (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (organization_id, phone_number_id)
);

CREATE TABLE dossier_organization_street_addresses (
    id INTEGER PRIMARY KEY,
    type TEXT,
    organization_id INTEGER NOT NULL REFERENCES dossier_organizations (id) ON DELETE CASCADE,
    street_address_id INTEGER NOT NULL REFERENCES dossier_street_addresses (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    UNIQUE (organization_id, street_address_id)
);
"#;

pub const PEOPLE_DOWN: &str = r#"
DROP TABLE dossier_organization_street_addresses;
DROP TABLE dossier_organization_phone_numbers;
DROP TABLE dossier_organization_email_addresses;
DROP TABLE dossier_organization_customers;
DROP TABLE dossier_organization_members;
DROP TABLE dossier_organization_departments;
DROP TABLE dossier_organizations;
DROP TABLE dossier_personal_street_addresses;
DROP TABLE dossier_personal_phone_numbers;
DROP TABLE dossier_personal_email_addresses;
DROP TABLE dossier_personal_connections;
DROP TABLE dossier_people;
DROP TABLE dossier_street_addresses;
DROP TABLE dossier_phone_numbers;
"#;

pub const FINDINGS_UP: &str = r#"
CREATE TABLE dossier_advisories (
    id TEXT PRIMARY KEY,
    prefix TEXT NOT NULL,
    year INTEGER,
    identifier TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE dossier_vulnerabilities (
    id INTEGER PRIMARY KEY,
    advisory_id TEXT NOT NULL REFERENCES dossier_advisories (id) ON DELETE CASCADE,
    ip_address_id INTEGER REFERENCES dossier_ip_addresses (id) ON DELETE CASCADE,
    host_name_id INTEGER REFERENCES dossier_host_names (id) ON DELETE CASCADE,
    open_port_id INTEGER REFERENCES dossier_open_ports (id) ON DELETE CASCADE,
    url_id INTEGER REFERENCES dossier_urls (id) ON DELETE CASCADE,
    software_id INTEGER REFERENCES dossier_softwares (id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    CHECK (
        (ip_address_id IS NOT NULL) + (host_name_id IS NOT NULL) + (open_port_id IS NOT NULL)
        + (url_id IS NOT NULL) + (software_id IS NOT NULL) = 1
    )
);
CREATE UNIQUE INDEX dossier_vulnerabilities_key ON dossier_vulnerabilities (
    advisory_id, IFNULL(ip_address_id, 0), IFNULL(host_name_id, 0), IFNULL(open_port_id, 0),
    IFNULL(url_id, 0), IFNULL(software_id, 0)
);

CREATE TABLE dossier_web_vulns (
    id INTEGER PRIMARY KEY,
    type TEXT NOT NULL,
    url_id INTEGER NOT NULL REFERENCES dossier_urls (id) ON DELETE CASCADE,
    request_method TEXT NOT NULL,
    query_param TEXT,
    header_name TEXT,
    cookie_param TEXT,
    form_param TEXT,
    user_agent TEXT,
    referer TEXT,
    test_string TEXT,
    lfi_os TEXT,
    lfi_depth INTEGER CHECK (lfi_depth >= 0),
    lfi_filter_bypass TEXT,
    rfi_script_lang TEXT,
    rfi_filter_bypass TEXT,
    ssti_escape_type TEXT,
    sqli_escape_quote INTEGER,
    sqli_escape_parens INTEGER,
    sqli_terminate INTEGER,
    command_injection_escape_operator TEXT,
    command_injection_terminator TEXT,
    created_at TEXT NOT NULL,
    CHECK (COALESCE(query_param, header_name, cookie_param, form_param) IS NOT NULL)
);
CREATE UNIQUE INDEX dossier_web_vulns_key ON dossier_web_vulns (
    type, url_id, request_method, IFNULL(query_param, ''), IFNULL(header_name, ''),
    IFNULL(cookie_param, ''), IFNULL(form_param, '')
);

CREATE TABLE dossier_notes (
    id INTEGER PRIMARY KEY,
    body TEXT NOT NULL,
    mac_address_id INTEGER REFERENCES dossier_mac_addresses (id) ON DELETE CASCADE,
    ip_address_id INTEGER REFERENCES dossier_ip_addresses (id) ON DELETE CASCADE,
    host_name_id INTEGER REFERENCES dossier_host_names (id) ON DELETE CASCADE,
    port_id INTEGER REFERENCES dossier_ports (id) ON DELETE CASCADE,
    service_id INTEGER REFERENCES dossier_services (id) ON DELETE CASCADE,
    open_port_id INTEGER REFERENCES dossier_open_ports (id) ON DELETE CASCADE,
    software_id INTEGER REFERENCES dossier_softwares (id) ON DELETE CASCADE,
    os_id INTEGER REFERENCES dossier_oses (id) ON DELETE CASCADE,
    asn_id INTEGER REFERENCES dossier_asns (id) ON DELETE CASCADE,
    cert_id INTEGER REFERENCES dossier_certs (id) ON DELETE CASCADE,
    url_id INTEGER REFERENCES dossier_urls (id) ON DELETE CASCADE,
    user_name_id INTEGER REFERENCES dossier_user_names (id) ON DELETE CASCADE,
    email_address_id INTEGER REFERENCES dossier_email_addresses (id) ON DELETE CASCADE,
    password_id INTEGER REFERENCES dossier_passwords (id) ON DELETE CASCADE,
    credential_id INTEGER REFERENCES dossier_credentials (id) ON DELETE CASCADE,
    advisory_id TEXT REFERENCES dossier_advisories (id) ON DELETE CASCADE,
    phone_number_id INTEGER REFERENCES dossier_phone_numbers (id) ON DELETE CASCADE,
    street_address_id INTEGER REFERENCES dossier_street_addresses (id) ON DELETE CASCADE,
    person_id INTEGER REFERENCES dossier_people (id) ON DELETE CASCADE,
    organization_id INTEGER REFERENCES dossier_organizations (id) ON DELETE CASCADE,
    web_vuln_id INTEGER REFERENCES dossier_web_vulns (id) ON DELETE CASCADE,
    updated_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    CHECK (
        (mac_address_id IS NOT NULL) + (ip_address_id IS NOT NULL) + (host_name_id IS NOT NULL)
        + (port_id IS NOT NULL) + (service_id IS NOT NULL) + (open_port_id IS NOT NULL)
        + (software_id IS NOT NULL) + (os_id IS NOT NULL) + (asn_id IS NOT NULL)
        + (cert_id IS NOT NULL) + (url_id IS NOT NULL) + (user_name_id IS NOT NULL)
        + (email_address_id IS NOT NULL) + (password_id IS NOT NULL)
        + (credential_id IS NOT NULL) + (advisory_id IS NOT NULL)
        + (phone_number_id IS NOT NULL) + (street_address_id IS NOT NULL)
        + (person_id IS NOT NULL) + (organization_id IS NOT NULL)
        + (web_vuln_id IS NOT NULL) = 1
    )
);
"#;

pub const FINDINGS_DOWN: &str = r#"
DROP TABLE dossier_notes;
DROP TABLE dossier_web_vulns;
DROP TABLE dossier_vulnerabilities;
DROP TABLE dossier_advisories;
"#;
