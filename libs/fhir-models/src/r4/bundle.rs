//! R4 Bundle
//!
//! Bundle is a plain `Resource`: it has no narrative, contained resources or
//! extensions at the top level. Entry resources are carried as untyped JSON and
//! bound on demand with [`BundleEntry::resource_as`] or through a catalog.

use ferrum_binding::{
    fhir_entity, Entity, EntityKind, Node, PropertyDef, PropertyRegistry, SchemaCatalog, Value,
};
use std::fmt;
use std::str::FromStr;

use super::datatypes::identifier_registry;
use crate::error::{Error, Result};

const BUNDLE_LINK_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("relation").required(),
    PropertyDef::primitive("url").required(),
];

pub static BUNDLE_LINK: PropertyRegistry =
    PropertyRegistry::new("BundleLink", EntityKind::Backbone, BUNDLE_LINK_PROPERTIES);

const BUNDLE_ENTRY_SEARCH_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("mode"),
    PropertyDef::primitive("score"),
];

pub static BUNDLE_ENTRY_SEARCH: PropertyRegistry = PropertyRegistry::new(
    "BundleEntrySearch",
    EntityKind::Backbone,
    BUNDLE_ENTRY_SEARCH_PROPERTIES,
);

const BUNDLE_ENTRY_REQUEST_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("method").required(),
    PropertyDef::primitive("url").required(),
    PropertyDef::primitive("ifNoneMatch"),
    PropertyDef::primitive("ifModifiedSince"),
    PropertyDef::primitive("ifMatch"),
    PropertyDef::primitive("ifNoneExist"),
];

pub static BUNDLE_ENTRY_REQUEST: PropertyRegistry = PropertyRegistry::new(
    "BundleEntryRequest",
    EntityKind::Backbone,
    BUNDLE_ENTRY_REQUEST_PROPERTIES,
);

const BUNDLE_ENTRY_RESPONSE_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::primitive("status").required(),
    PropertyDef::primitive("location"),
    PropertyDef::primitive("etag"),
    PropertyDef::primitive("lastModified"),
    PropertyDef::resource("outcome"),
];

pub static BUNDLE_ENTRY_RESPONSE: PropertyRegistry = PropertyRegistry::new(
    "BundleEntryResponse",
    EntityKind::Backbone,
    BUNDLE_ENTRY_RESPONSE_PROPERTIES,
);

const BUNDLE_ENTRY_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("link", link_registry).many(),
    PropertyDef::primitive("fullUrl"),
    PropertyDef::resource("resource"),
    PropertyDef::complex("search", search_registry),
    PropertyDef::complex("request", request_registry),
    PropertyDef::complex("response", response_registry),
];

pub static BUNDLE_ENTRY: PropertyRegistry =
    PropertyRegistry::new("BundleEntry", EntityKind::Backbone, BUNDLE_ENTRY_PROPERTIES);

const BUNDLE_PROPERTIES: &[PropertyDef] = &[
    PropertyDef::complex("identifier", identifier_registry),
    PropertyDef::primitive("type").required(),
    PropertyDef::primitive("timestamp"),
    PropertyDef::primitive("total"),
    PropertyDef::complex("link", link_registry).many(),
    PropertyDef::complex("entry", entry_registry).many(),
    PropertyDef::opaque("signature"),
];

pub static BUNDLE: PropertyRegistry =
    PropertyRegistry::new("Bundle", EntityKind::Resource, BUNDLE_PROPERTIES);

fn link_registry() -> &'static PropertyRegistry {
    &BUNDLE_LINK
}

fn search_registry() -> &'static PropertyRegistry {
    &BUNDLE_ENTRY_SEARCH
}

fn request_registry() -> &'static PropertyRegistry {
    &BUNDLE_ENTRY_REQUEST
}

fn response_registry() -> &'static PropertyRegistry {
    &BUNDLE_ENTRY_RESPONSE
}

fn entry_registry() -> &'static PropertyRegistry {
    &BUNDLE_ENTRY
}

fhir_entity! {
    /// FHIR Bundle resource
    ///
    /// A container for a collection of resources.
    pub struct Bundle => BUNDLE;
    pub builder BundleBuilder;
}

fhir_entity! {
    /// Links related to this Bundle
    pub struct BundleLink => BUNDLE_LINK;
    pub builder BundleLinkBuilder;
}

fhir_entity! {
    /// Entry in the bundle - will have a resource or information
    pub struct BundleEntry => BUNDLE_ENTRY;
    pub builder BundleEntryBuilder;
}

fhir_entity! {
    /// Search-related information for a Bundle entry
    pub struct BundleEntrySearch => BUNDLE_ENTRY_SEARCH;
    pub builder BundleEntrySearchBuilder;
}

fhir_entity! {
    /// Request details for a Bundle entry
    pub struct BundleEntryRequest => BUNDLE_ENTRY_REQUEST;
    pub builder BundleEntryRequestBuilder;
}

fhir_entity! {
    /// Response details for a Bundle entry
    pub struct BundleEntryResponse => BUNDLE_ENTRY_RESPONSE;
    pub builder BundleEntryResponseBuilder;
}

/// Type of Bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleType {
    /// Document Bundle - A set of resources composing a single coherent document
    Document,
    /// Message Bundle - A message (application/response or application/request)
    Message,
    /// Transaction Bundle - A transaction - intended to be processed atomically
    Transaction,
    /// Transaction Response Bundle - Response to a transaction
    TransactionResponse,
    /// Batch Bundle - A set of resources collected for a specific purpose
    Batch,
    /// Batch Response Bundle - Response to a batch
    BatchResponse,
    /// History Bundle - A list of resources with history
    History,
    /// Search Results Bundle - Results of a search operation
    Searchset,
    /// Collection Bundle - A set of resources collected for a specific purpose
    Collection,
}

impl BundleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleType::Document => "document",
            BundleType::Message => "message",
            BundleType::Transaction => "transaction",
            BundleType::TransactionResponse => "transaction-response",
            BundleType::Batch => "batch",
            BundleType::BatchResponse => "batch-response",
            BundleType::History => "history",
            BundleType::Searchset => "searchset",
            BundleType::Collection => "collection",
        }
    }
}

impl fmt::Display for BundleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BundleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "document" => Ok(BundleType::Document),
            "message" => Ok(BundleType::Message),
            "transaction" => Ok(BundleType::Transaction),
            "transaction-response" => Ok(BundleType::TransactionResponse),
            "batch" => Ok(BundleType::Batch),
            "batch-response" => Ok(BundleType::BatchResponse),
            "history" => Ok(BundleType::History),
            "searchset" => Ok(BundleType::Searchset),
            "collection" => Ok(BundleType::Collection),
            other => Err(Error::InvalidFieldValue(format!(
                "Bundle.type: unknown code '{}'",
                other
            ))),
        }
    }
}

/// Why an entry is in the result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleEntrySearchMode {
    /// This resource matched the search specification
    Match,
    /// This resource is returned because it is referred to from another resource in the search set
    Include,
    /// An OperationOutcome providing additional information about the processing of a search entry
    Outcome,
}

impl BundleEntrySearchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleEntrySearchMode::Match => "match",
            BundleEntrySearchMode::Include => "include",
            BundleEntrySearchMode::Outcome => "outcome",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "match" => Some(BundleEntrySearchMode::Match),
            "include" => Some(BundleEntrySearchMode::Include),
            "outcome" => Some(BundleEntrySearchMode::Outcome),
            _ => None,
        }
    }
}

impl Bundle {
    /// Create a new Bundle with minimal required fields
    pub fn new(bundle_type: BundleType) -> Self {
        Self::builder().bundle_type(bundle_type).build()
    }

    /// Bundle type; `None` when absent or not a known code
    pub fn bundle_type(&self) -> Option<BundleType> {
        self.node().get_str("type")?.parse().ok()
    }

    /// Check if this is a transaction bundle
    pub fn is_transaction(&self) -> bool {
        matches!(self.bundle_type(), Some(BundleType::Transaction))
    }

    /// Check if this is a batch bundle
    pub fn is_batch(&self) -> bool {
        matches!(self.bundle_type(), Some(BundleType::Batch))
    }

    /// Check if this is a search result bundle
    pub fn is_searchset(&self) -> bool {
        matches!(self.bundle_type(), Some(BundleType::Searchset))
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.node().get_str("timestamp")
    }

    /// If search, the total number of matches
    pub fn total(&self) -> Option<u64> {
        self.node().get("total").and_then(Value::as_u64)
    }

    /// Get the number of entries in the bundle
    pub fn entry_count(&self) -> usize {
        self.node().get_array("entry").len()
    }

    pub fn entries(&self) -> Vec<BundleEntry> {
        self.node().get_all("entry")
    }

    pub fn links(&self) -> Vec<BundleLink> {
        self.node().get_all("link")
    }

    /// URL of the first link with the given relation (`self`, `next`, ...)
    pub fn link_url(&self, relation: &str) -> Option<String> {
        self.links()
            .into_iter()
            .find(|link| link.relation() == Some(relation))
            .and_then(|link| link.url().map(str::to_string))
    }

    /// New bundle with `entry` appended
    pub fn add_entry(&self, entry: BundleEntry) -> Self {
        self.to_builder().entry(entry).build()
    }

    /// New bundle with a link appended
    pub fn add_link(&self, relation: impl Into<String>, url: impl Into<String>) -> Self {
        self.to_builder().link(relation, url).build()
    }

    /// Entry resources bound through `catalog`; entries without a resource or
    /// with an unknown type are skipped
    pub fn bind_resources(&self, catalog: &dyn SchemaCatalog) -> Vec<Node> {
        self.entries()
            .iter()
            .filter_map(BundleEntry::resource)
            .filter_map(|resource| match Node::bind_resource(catalog, resource.clone()) {
                Ok(node) => Some(node),
                Err(err) => {
                    tracing::debug!(error = %err, "skipping bundle entry resource");
                    None
                }
            })
            .collect()
    }

    /// Entry resources of type `R`, in entry order
    pub fn resources_of<R: Entity>(&self) -> Vec<R> {
        self.entries()
            .iter()
            .filter_map(|entry| entry.resource_as::<R>().ok())
            .collect()
    }
}

impl BundleBuilder {
    pub fn bundle_type(self, bundle_type: BundleType) -> Self {
        self.set("type", bundle_type.as_str())
    }

    pub fn timestamp(self, timestamp: impl Into<String>) -> Self {
        self.set("timestamp", timestamp.into())
    }

    pub fn total(self, total: u32) -> Self {
        self.set("total", total)
    }

    /// Add a link to the bundle
    pub fn link(self, relation: impl Into<String>, url: impl Into<String>) -> Self {
        self.add("link", BundleLink::new(relation, url))
    }

    /// Add an entry to the bundle
    pub fn entry(self, entry: BundleEntry) -> Self {
        self.add("entry", entry)
    }
}

impl BundleLink {
    pub fn new(relation: impl Into<String>, url: impl Into<String>) -> Self {
        Self::builder()
            .set("relation", relation.into())
            .set("url", url.into())
            .build()
    }

    pub fn relation(&self) -> Option<&str> {
        self.node().get_str("relation")
    }

    pub fn url(&self) -> Option<&str> {
        self.node().get_str("url")
    }
}

impl BundleEntry {
    /// Entry wrapping `resource` under `full_url`
    pub fn for_resource<R: Entity>(full_url: impl Into<String>, resource: &R) -> Self {
        Self::builder()
            .full_url(full_url)
            .resource(resource.to_json())
            .build()
    }

    pub fn full_url(&self) -> Option<&str> {
        self.node().get_str("fullUrl")
    }

    /// A resource in this bundle
    pub fn resource(&self) -> Option<&Value> {
        self.node().get("resource")
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.resource()?.get("resourceType")?.as_str()
    }

    /// Bind the entry resource as `R`
    pub fn resource_as<R: Entity>(&self) -> Result<R> {
        let resource = self
            .resource()
            .ok_or_else(|| Error::MissingField("BundleEntry.resource".to_string()))?;
        let expected = R::registry().type_name();
        match self.resource_type() {
            Some(found) if found == expected => Ok(R::from_json(resource.clone())),
            found => Err(Error::Binding(ferrum_binding::Error::ResourceTypeMismatch {
                expected: expected.to_string(),
                found: found.unwrap_or("<none>").to_string(),
            })),
        }
    }

    pub fn search(&self) -> Option<BundleEntrySearch> {
        self.node().get_as("search")
    }

    pub fn request(&self) -> Option<BundleEntryRequest> {
        self.node().get_as("request")
    }

    pub fn response(&self) -> Option<BundleEntryResponse> {
        self.node().get_as("response")
    }
}

impl BundleEntryBuilder {
    pub fn full_url(self, full_url: impl Into<String>) -> Self {
        self.set("fullUrl", full_url.into())
    }

    pub fn resource(self, resource: impl Into<Value>) -> Self {
        self.set("resource", resource)
    }

    pub fn search(self, search: BundleEntrySearch) -> Self {
        self.set("search", search)
    }

    pub fn request(self, request: BundleEntryRequest) -> Self {
        self.set("request", request)
    }

    pub fn response(self, response: BundleEntryResponse) -> Self {
        self.set("response", response)
    }
}

impl BundleEntrySearch {
    pub fn new(mode: BundleEntrySearchMode, score: Option<f64>) -> Self {
        let builder = Self::builder().set("mode", mode.as_str());
        match score {
            Some(score) => builder.set("score", score).build(),
            None => builder.build(),
        }
    }

    pub fn mode(&self) -> Option<BundleEntrySearchMode> {
        self.node().get_str("mode").and_then(BundleEntrySearchMode::parse)
    }

    /// Search ranking (between 0 and 1)
    pub fn score(&self) -> Option<f64> {
        self.node().get_f64("score")
    }
}

impl BundleEntryRequest {
    /// `method` is one of `GET | HEAD | POST | PUT | DELETE | PATCH`
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self::builder()
            .set("method", method.into())
            .set("url", url.into())
            .build()
    }

    pub fn method(&self) -> Option<&str> {
        self.node().get_str("method")
    }

    pub fn url(&self) -> Option<&str> {
        self.node().get_str("url")
    }

    pub fn if_none_exist(&self) -> Option<&str> {
        self.node().get_str("ifNoneExist")
    }
}

impl BundleEntryRequestBuilder {
    pub fn if_none_match(self, etag: impl Into<String>) -> Self {
        self.set("ifNoneMatch", etag.into())
    }

    pub fn if_match(self, etag: impl Into<String>) -> Self {
        self.set("ifMatch", etag.into())
    }

    pub fn if_none_exist(self, query: impl Into<String>) -> Self {
        self.set("ifNoneExist", query.into())
    }
}

impl BundleEntryResponse {
    pub fn status(&self) -> Option<&str> {
        self.node().get_str("status")
    }

    pub fn location(&self) -> Option<&str> {
        self.node().get_str("location")
    }

    pub fn etag(&self) -> Option<&str> {
        self.node().get_str("etag")
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.node().get_str("lastModified")
    }
}

impl BundleEntryResponseBuilder {
    pub fn status(self, status: impl Into<String>) -> Self {
        self.set("status", status.into())
    }

    pub fn location(self, location: impl Into<String>) -> Self {
        self.set("location", location.into())
    }

    pub fn etag(self, etag: impl Into<String>) -> Self {
        self.set("etag", etag.into())
    }

    pub fn last_modified(self, last_modified: impl Into<String>) -> Self {
        self.set("lastModified", last_modified.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::r4::patient::Patient;
    use serde_json::json;

    #[test]
    fn test_deserialize_bundle() {
        let json = json!({
            "resourceType": "Bundle",
            "id": "example-bundle",
            "type": "searchset",
            "total": 1,
            "entry": [
                {
                    "fullUrl": "http://example.org/fhir/Patient/123",
                    "resource": {
                        "resourceType": "Patient",
                        "id": "123"
                    },
                    "search": {
                        "mode": "match",
                        "score": 1.0
                    }
                }
            ]
        });

        let bundle: Bundle = serde_json::from_value(json).unwrap();
        assert_eq!(bundle.id(), Some("example-bundle"));
        assert_eq!(bundle.bundle_type(), Some(BundleType::Searchset));
        assert_eq!(bundle.total(), Some(1));
        assert_eq!(bundle.entry_count(), 1);

        let search = bundle.entries()[0].search().unwrap();
        assert_eq!(search.mode(), Some(BundleEntrySearchMode::Match));
        assert_eq!(search.score(), Some(1.0));
    }

    #[test]
    fn test_serialize_bundle() {
        let bundle = Bundle::new(BundleType::Transaction);
        let json = serde_json::to_value(&bundle).unwrap();
        assert_eq!(json, json!({"resourceType": "Bundle", "type": "transaction"}));
    }

    #[test]
    fn test_bundle_has_no_domain_slots() {
        let bundle = Bundle::from_json(json!({
            "resourceType": "Bundle",
            "type": "collection",
            "text": {"status": "generated", "div": "<div/>"},
            "extension": [{"url": "http://example.org/x", "valueBoolean": true}]
        }));
        assert_eq!(bundle.to_json(), json!({"resourceType": "Bundle", "type": "collection"}));
    }

    #[test]
    fn test_is_transaction() {
        let bundle = Bundle::new(BundleType::Transaction);
        assert!(bundle.is_transaction());
        assert!(!bundle.is_batch());
    }

    #[test]
    fn test_is_batch() {
        let bundle = Bundle::new(BundleType::Batch);
        assert!(bundle.is_batch());
        assert!(!bundle.is_transaction());
    }

    #[test]
    fn test_is_searchset() {
        let bundle = Bundle::new(BundleType::Searchset);
        assert!(bundle.is_searchset());
    }

    #[test]
    fn test_bundle_type_codes() {
        assert_eq!(
            "transaction-response".parse::<BundleType>().unwrap(),
            BundleType::TransactionResponse
        );
        assert!(matches!(
            "bogus".parse::<BundleType>(),
            Err(Error::InvalidFieldValue(_))
        ));
    }

    #[test]
    fn test_add_entry() {
        let bundle = Bundle::new(BundleType::Collection);
        let entry = BundleEntry::builder()
            .full_url("http://example.org/fhir/Patient/123")
            .resource(json!({"resourceType": "Patient", "id": "123"}))
            .build();

        let grown = bundle.add_entry(entry);
        assert_eq!(grown.entry_count(), 1);
        assert_eq!(bundle.entry_count(), 0);
        assert_eq!(grown.entries()[0].resource_type(), Some("Patient"));
    }

    #[test]
    fn test_add_link() {
        let bundle = Bundle::new(BundleType::Searchset)
            .add_link("self", "http://example.org/fhir/Patient?_id=123");
        assert_eq!(bundle.links().len(), 1);
        assert_eq!(bundle.links()[0].relation(), Some("self"));
        assert_eq!(
            bundle.link_url("self").as_deref(),
            Some("http://example.org/fhir/Patient?_id=123")
        );
        assert_eq!(bundle.link_url("next"), None);
    }

    #[test]
    fn test_bundle_entry_request() {
        let request = BundleEntryRequest::new("POST", "Patient")
            .to_builder()
            .if_none_exist("identifier=http://example.org|1")
            .build();

        let json = request.to_json();
        assert_eq!(json["method"], "POST");
        assert_eq!(json["url"], "Patient");
        assert_eq!(request.if_none_exist(), Some("identifier=http://example.org|1"));
    }

    #[test]
    fn test_bundle_entry_response() {
        let response = BundleEntryResponse::builder()
            .location("Patient/123/_history/1")
            .status("201 Created")
            .etag("W/\"1\"")
            .last_modified("2023-01-01T00:00:00Z")
            .build();

        let json = response.to_json();
        assert_eq!(json["status"], "201 Created");
        assert_eq!(json["location"], "Patient/123/_history/1");
        assert_eq!(
            json.as_object().unwrap().keys().collect::<Vec<_>>(),
            vec!["status", "location", "etag", "lastModified"]
        );
    }

    #[test]
    fn test_resource_as() {
        let patient = Patient::builder().id("123").gender("female").build();
        let entry = BundleEntry::for_resource("urn:uuid:1", &patient);

        assert_eq!(entry.resource_as::<Patient>().unwrap(), patient);
        assert!(matches!(
            BundleEntry::default().resource_as::<Patient>(),
            Err(Error::MissingField(_))
        ));
        let bundle = Bundle::new(BundleType::Collection).add_entry(entry);
        assert_eq!(bundle.resources_of::<Patient>(), vec![patient]);
    }
}
