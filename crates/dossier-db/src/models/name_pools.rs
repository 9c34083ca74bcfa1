//! Lookup tables of unique names shared by the composite records.

name_pool!(
    /// Login names, shared by credentials and email addresses.
    UserName,
    "dossier_user_names"
);

name_pool!(
    /// Network service names (`http`, `ssh`, …) seen on open ports.
    Service,
    "dossier_services"
);

name_pool!(SoftwareVendor, "dossier_software_vendors");

name_pool!(
    /// URL schemes (`http`, `https`, `ftp`, …).
    UrlScheme,
    "dossier_url_schemes"
);

name_pool!(HttpHeaderName, "dossier_http_header_names");

name_pool!(HttpQueryParamName, "dossier_http_query_param_names");

name_pool!(UrlQueryParamName, "dossier_url_query_param_names");

name_pool!(
    /// Common names and subjectAltName values from certificates.
    CertName,
    "dossier_cert_names"
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Database;
    use crate::record::{Importable, Record};

    #[test]
    fn test_import_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let first = UserName::import(&db, "admin").unwrap();
        let second = UserName::import(&db, "  admin ").unwrap();
        assert_eq!(first, second);
        assert_eq!(UserName::count(&db).unwrap(), 1);
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let err = Service::import(&db, "   ").unwrap_err();
        assert!(err.is_validation());
        assert!(err.validation_errors().unwrap().has("name"));
        assert_eq!(Service::count(&db).unwrap(), 0);
    }

    #[test]
    fn test_lookup_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(UrlScheme::lookup(&db, "gopher").unwrap().is_none());
        UrlScheme::import(&db, "gopher").unwrap();
        assert_eq!(
            UrlScheme::lookup(&db, "gopher").unwrap().unwrap().to_string(),
            "gopher"
        );
    }

    #[test]
    fn test_name_scopes() {
        let db = Database::open_in_memory().unwrap();
        for name in ["Content-Type", "Content-Length", "X-Forwarded-For", "100%_done"] {
            HttpHeaderName::import(&db, name).unwrap();
        }
        let content = HttpHeaderName::query().name_like("Content-").all(&db).unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(
            HttpHeaderName::query().name_like("%_").count(&db).unwrap(),
            1
        );
        assert!(HttpHeaderName::query()
            .named("X-Forwarded-For")
            .exists(&db)
            .unwrap());
    }

    #[test]
    fn test_destroy() {
        let db = Database::open_in_memory().unwrap();
        let vendor = SoftwareVendor::import(&db, "Acme").unwrap();
        vendor.destroy(&db).unwrap();
        assert!(SoftwareVendor::find(&db, vendor.id).unwrap().is_none());
        assert!(vendor.destroy(&db).unwrap_err().is_not_found());
    }
}
