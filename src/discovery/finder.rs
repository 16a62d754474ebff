//! Discovery of principals, home sets and collections from minimal input.
//!
//! Each service type is resolved on its own. For a service, the steps are:
//!
//! 1. probe the user-given URL (collection, home sets, principal),
//! 2. `/.well-known/{carddav,caldav}` on the same host if it is `https`,
//! 3. DNS SRV/TXT for the discovery domain, trying the TXT path, the
//!    well-known path and `/` in that order.
//!
//! A principal candidate is only accepted after an OPTIONS request shows the
//! service's capability token. Any failure inside a step just means the step
//! found nothing.

use crate::discovery::dns::{
    ServiceResolver, SystemResolver, path_from_txt, select_srv, service_query_name,
};
use crate::discovery::types::{CollectionInfo, Configuration, LoginTarget, ServiceInfo};
use crate::error::{DavError, Result};
use crate::webdav::client::WebDavClient;
use crate::webdav::location::ResourceLocation;
use crate::webdav::types::{PropfindPurpose, ServiceType};

/// Where DNS-discovered servers are contacted when SRV has no answer.
#[derive(Debug, Clone)]
pub struct FinderOptions {
    /// Scheme used for hosts found through DNS.
    pub dns_scheme: String,
    /// Port used with the bare domain when no SRV record exists.
    pub dns_fallback_port: u16,
}

impl Default for FinderOptions {
    fn default() -> Self {
        Self {
            dns_scheme: "https".to_string(),
            dns_fallback_port: 443,
        }
    }
}

/// Runs discovery with one client (and therefore one set of credentials).
#[derive(Debug, Clone)]
pub struct DavResourceFinder<R = SystemResolver> {
    client: WebDavClient,
    resolver: R,
    options: FinderOptions,
}

impl DavResourceFinder<SystemResolver> {
    pub fn new(client: WebDavClient) -> Result<Self> {
        Ok(Self::with_resolver(client, SystemResolver::from_system_conf()?))
    }
}

impl<R: ServiceResolver> DavResourceFinder<R> {
    pub fn with_resolver(client: WebDavClient, resolver: R) -> Self {
        Self {
            client,
            resolver,
            options: FinderOptions::default(),
        }
    }

    pub fn options(mut self, options: FinderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn client(&self) -> &WebDavClient {
        &self.client
    }

    /// Discover both services. Fails with [`DavError::NothingDetected`] only
    /// when neither service is available.
    pub async fn find_initial_configuration(&self, target: &LoginTarget) -> Result<Configuration> {
        let card = self.find_service(target, ServiceType::CardDav).await;
        let cal = self.find_service(target, ServiceType::CalDav).await;

        let config = Configuration {
            target: target.clone(),
            card_dav: card.is_available().then_some(card),
            cal_dav: cal.is_available().then_some(cal),
        };
        if config.card_dav.is_none() && config.cal_dav.is_none() {
            tracing::info!(%target, "no CalDAV or CardDAV service found");
            return Err(DavError::NothingDetected);
        }
        Ok(config)
    }

    /// Discover one service. Never fails; an unavailable service comes back
    /// with nothing set.
    pub async fn find_service(&self, target: &LoginTarget, service: ServiceType) -> ServiceInfo {
        let mut info = ServiceInfo::new(service);

        if let LoginTarget::Url(base) = target {
            if let Err(err) = self.probe_user_url(base, service, &mut info).await {
                tracing::debug!(service = service.as_str(), url = %base, error = %err, "user URL probe failed");
            }

            if info.principal.is_none() && base.is_https() {
                match base.resolve(service.well_known_path()) {
                    Ok(well_known) => info.principal = self.principal_at(&well_known, service).await,
                    Err(err) => tracing::debug!(error = %err, "cannot build well-known URL"),
                }
            }
        }

        if info.principal.is_none()
            && let Some(domain) = target.discovery_domain()
        {
            info.principal = self.discover_via_dns(domain, service).await;
        }

        if let Some(principal) = info.principal.clone() {
            self.enrich_from_principal(&principal, &mut info).await;
        }

        tracing::debug!(
            service = service.as_str(),
            available = info.is_available(),
            principal = ?info.principal,
            home_sets = info.home_sets.len(),
            collections = info.collections.len(),
            "discovery finished"
        );
        info
    }

    async fn probe_user_url(
        &self,
        base: &ResourceLocation,
        service: ServiceType,
        info: &mut ServiceInfo,
    ) -> Result<()> {
        let result = self
            .client
            .propfind(base, PropfindPurpose::ResourceProbe(service))
            .await?;
        let Some(resource) = result.into_single() else {
            return Ok(());
        };
        let props = &resource.properties;

        if let Some(collection) = CollectionInfo::from_properties(&resource.location, props, service) {
            tracing::debug!(url = %collection.location, "user URL is a collection");
            if let Ok(home) = collection.location.resolve("../") {
                info.home_sets.insert(home);
            }
            info.add_collection(collection);
        }

        for href in props.home_set(service) {
            match resource.location.resolve(href) {
                Ok(home) => {
                    info.home_sets.insert(home.as_collection());
                }
                Err(err) => tracing::debug!(href, error = %err, "ignoring home set"),
            }
        }

        let candidate = match props.current_user_principal() {
            Some(href) => Some(resource.location.resolve(href)?),
            None if props.resource_type().principal => Some(resource.location.clone()),
            None => None,
        };
        if let Some(candidate) = candidate
            && self.verify_principal(&candidate, service).await
        {
            info.principal = Some(candidate);
        }
        Ok(())
    }

    /// Ask `location` for `current-user-principal` and verify the answer.
    async fn principal_at(
        &self,
        location: &ResourceLocation,
        service: ServiceType,
    ) -> Option<ResourceLocation> {
        let result = match self
            .client
            .propfind(location, PropfindPurpose::PrincipalLookup)
            .await
        {
            Ok(result) => result,
            Err(err) => {
                tracing::debug!(url = %location, error = %err, "principal lookup failed");
                return None;
            }
        };
        let resource = result.into_single()?;
        let href = resource.properties.current_user_principal()?;
        let principal = match resource.location.resolve(href) {
            Ok(principal) => principal,
            Err(err) => {
                tracing::debug!(href, error = %err, "unusable principal href");
                return None;
            }
        };

        if self.verify_principal(&principal, service).await {
            Some(principal)
        } else {
            None
        }
    }

    async fn verify_principal(&self, principal: &ResourceLocation, service: ServiceType) -> bool {
        match self.client.supports(principal, service).await {
            Ok(true) => {
                tracing::debug!(url = %principal, service = service.as_str(), "principal accepted");
                true
            }
            Ok(false) => {
                tracing::debug!(
                    url = %principal,
                    capability = service.capability(),
                    "principal lacks capability, rejected"
                );
                false
            }
            Err(err) => {
                tracing::debug!(url = %principal, error = %err, "capability check failed");
                false
            }
        }
    }

    async fn discover_via_dns(&self, domain: &str, service: ServiceType) -> Option<ResourceLocation> {
        let query = service_query_name(service, domain);

        let (host, port) = match self.resolver.lookup_srv(&query).await {
            Ok(records) if !records.is_empty() => {
                let best = select_srv(&records)?;
                (best.target.clone(), best.port)
            }
            Ok(_) => (domain.to_string(), self.options.dns_fallback_port),
            Err(err) => {
                tracing::debug!(%query, error = %err, "SRV lookup failed");
                (domain.to_string(), self.options.dns_fallback_port)
            }
        };

        let mut paths = Vec::with_capacity(3);
        match self.resolver.lookup_txt(&query).await {
            Ok(records) => paths.extend(path_from_txt(&records)),
            Err(err) => tracing::debug!(%query, error = %err, "TXT lookup failed"),
        }
        paths.push(service.well_known_path().to_string());
        paths.push("/".to_string());

        for path in paths {
            let candidate =
                match ResourceLocation::from_parts(&self.options.dns_scheme, &host, port, &path) {
                    Ok(candidate) => candidate,
                    Err(err) => {
                        tracing::debug!(%host, port, %path, error = %err, "unusable DNS candidate");
                        continue;
                    }
                };
            tracing::debug!(url = %candidate, "trying DNS candidate");
            if let Some(principal) = self.principal_at(&candidate, service).await {
                return Some(principal);
            }
        }
        None
    }

    /// Home sets and, for CalDAV, the user's email address.
    async fn enrich_from_principal(&self, principal: &ResourceLocation, info: &mut ServiceInfo) {
        let service = info.service;

        match self
            .client
            .propfind(principal, PropfindPurpose::HomeSetLookup)
            .await
        {
            Ok(result) => {
                if let Some(resource) = result.into_single() {
                    for href in resource.properties.home_set(service) {
                        if let Ok(home) = resource.location.resolve(href) {
                            info.home_sets.insert(home.as_collection());
                        }
                    }
                }
            }
            Err(err) => tracing::debug!(url = %principal, error = %err, "home set lookup failed"),
        }

        if service == ServiceType::CalDav {
            match self
                .client
                .propfind(principal, PropfindPurpose::EmailAddressSet)
                .await
            {
                Ok(result) => {
                    info.email = result
                        .into_single()
                        .and_then(|r| first_mailto(r.properties.calendar_user_addresses()));
                }
                Err(err) => tracing::debug!(url = %principal, error = %err, "address set lookup failed"),
            }
        }
    }
}

/// The first `mailto:` address, without the scheme.
pub fn first_mailto(addresses: &[String]) -> Option<String> {
    addresses.iter().find_map(|href| {
        let (scheme, address) = href.split_once(':')?;
        (scheme.eq_ignore_ascii_case("mailto") && !address.is_empty()).then(|| address.to_string())
    })
}
