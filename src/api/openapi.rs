use super::handlers::{health, login, logout, register, session};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI document.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(register::register))
        .routes(routes!(login::login))
        .routes(routes!(logout::logout))
        .routes(routes!(session::session));

    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Liveness and build information".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Registration, login and logout via the authority".to_string());

    router.get_openapi_mut().tags = Some(vec![health_tag, auth_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(non_empty(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = contact_from_authors(env!("CARGO_PKG_AUTHORS"));
    info.license = non_empty(env!("CARGO_PKG_LICENSE")).map(|spdx| {
        let mut license = License::new(spdx);
        license.identifier = Some(spdx.to_string());
        license
    });

    OpenApiBuilder::new().info(info).build()
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|value| !value.is_empty())
}

/// Contact from the first Cargo author, `Name <email>` or either part alone.
fn contact_from_authors(authors: &str) -> Option<Contact> {
    let primary = authors.split(';').next()?;
    let (name, email) = match primary.split_once('<') {
        Some((name, rest)) => (name, non_empty(rest.trim_end().trim_end_matches('>'))),
        None => (primary, None),
    };
    let name = non_empty(name);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));

        let contact = doc.info.contact;
        assert_eq!(
            contact.as_ref().and_then(|c| c.name.as_deref()),
            Some("Team Authgate")
        );
        assert_eq!(
            contact.as_ref().and_then(|c| c.email.as_deref()),
            Some("team@authgate.dev")
        );

        assert_eq!(
            doc.info.license.map(|license| license.name),
            Some("BSD-3-Clause".to_string())
        );
    }

    #[test]
    fn openapi_documents_gateway_paths() {
        let doc = openapi();
        for path in ["/health", "/register", "/login", "/logout", "/session"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let tags = doc.tags.unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "auth"));
    }

    #[test]
    fn contact_from_author_variants() {
        let parts = |authors: &str| {
            contact_from_authors(authors).map(|c| (c.name, c.email))
        };
        assert_eq!(
            parts("Jane Doe <jane@example.com>; Ops <ops@example.com>"),
            Some((Some("Jane Doe".to_string()), Some("jane@example.com".to_string())))
        );
        assert_eq!(parts("Jane Doe"), Some((Some("Jane Doe".to_string()), None)));
        assert_eq!(
            parts("<ops@example.com>"),
            Some((None, Some("ops@example.com".to_string())))
        );
        assert_eq!(parts("  "), None);
    }
}
