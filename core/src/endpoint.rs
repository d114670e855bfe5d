//! Remote endpoint paths, relative to the session host.

/// Every endpoint the client calls, with the values its path needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint<'a> {
    Login,
    Logout,
    Entities,
    Entity(&'a str),
    /// Keyed by entity label.
    StandardFields(&'a str),
    /// Keyed by entity label.
    CustomFields(&'a str),
    /// Keyed by entity code.
    DisplayField { code: &'a str, field: &'a str },
    EntityStatuses(&'a str),
    Records(&'a str),
    RecordsSearch(&'a str),
    Record { entity: &'a str, id: u64 },
    RelatedRecord { entity: &'a str, id: u64, related: &'a str },
}

impl Endpoint<'_> {
    pub fn path(&self) -> String {
        match self {
            Endpoint::Login => "login".to_string(),
            Endpoint::Logout => "logout".to_string(),
            Endpoint::Entities => "object/info".to_string(),
            Endpoint::Entity(entity) => format!("object/info/{entity}"),
            Endpoint::StandardFields(label) => format!("object/{label}/description/standard"),
            Endpoint::CustomFields(label) => format!("object/{label}/description/custom"),
            Endpoint::DisplayField { code, field } => format!("object/displayfield/{code}/{field}"),
            Endpoint::EntityStatuses(entity) => format!("object/status/{entity}"),
            Endpoint::Records(entity) => format!("object/{entity}"),
            Endpoint::RecordsSearch(entity) => format!("object/{entity}/search"),
            Endpoint::Record { entity, id } => format!("object/{entity}/{id}"),
            Endpoint::RelatedRecord { entity, id, related } => format!("object/{entity}/{id}/{related}"),
        }
    }
}
