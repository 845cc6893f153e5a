use crate::descriptor::ServiceDescriptor;
use crate::error::Result;
use crate::http::{HttpResponse, Transport};
use crate::request::{build_request, HttpRequest};
use serde::Serialize;

/// One version of a named API, borrowed from a [`DiscoveryDocument`](crate::DiscoveryDocument).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Api<'a> {
    name: &'a str,
    version: &'a str,
    service: &'a ServiceDescriptor,
}

impl<'a> Api<'a> {
    pub fn new(name: &'a str, version: &'a str, service: &'a ServiceDescriptor) -> Self {
        Self {
            name,
            version,
            service,
        }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn version(&self) -> &'a str {
        self.version
    }

    pub fn service(&self) -> &'a ServiceDescriptor {
        self.service
    }

    pub fn build_request<P>(&self, identifier: &str, parameters: &P) -> Result<HttpRequest>
    where
        P: Serialize + ?Sized,
    {
        build_request(self.service, identifier, parameters)
    }

    /// Builds the request for `identifier` and runs it through `transport`.
    pub fn execute<T, P>(&self, transport: &T, identifier: &str, parameters: &P) -> Result<HttpResponse>
    where
        T: Transport + ?Sized,
        P: Serialize + ?Sized,
    {
        let request = self.build_request(identifier, parameters)?;
        transport.execute(&request)
    }
}
