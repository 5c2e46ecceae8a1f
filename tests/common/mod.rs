// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

#![allow(dead_code)]

use cartsync::{
    config::{ServerSection, SyncSettings},
    ServerProfile, WebDavClient,
};

use wiremock::MockServer;

/// Server path of the code directory used throughout the tests.
pub(crate) const ROOT: &str = "/on/demandware.servlet/webdav/Sites/Cartridges/version1";

/// Basic credentials of "admin:hunter2".
pub(crate) const AUTHORIZATION: &str = "Basic YWRtaW46aHVudGVyMg==";

pub(crate) fn profile(verify_code_directory: bool) -> ServerProfile {
    let server = ServerSection {
        hostname: "dev01.example.com".into(),
        username: "admin".into(),
        password: Some("hunter2".into()),
        directory: "version1".into(),
        enabled: true,
    };
    let settings = SyncSettings {
        verify_ssl_certificates: true,
        verify_code_directory,
    };
    ServerProfile::new(&server, "hunter2", &settings)
}

pub(crate) fn client(server: &MockServer, verify_code_directory: bool) -> WebDavClient {
    WebDavClient::with_origin(&profile(verify_code_directory), server.uri())
        .expect("client builds")
}

/// Multi-status body listing target hrefs.
pub(crate) fn multistatus(hrefs: &[&str]) -> String {
    let responses = hrefs
        .iter()
        .map(|href| format!("<d:response><d:href>{href}</d:href></d:response>"))
        .collect::<String>();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <d:multistatus xmlns:d=\"DAV:\">{responses}</d:multistatus>"
    )
}

/// Method and path of every request the server received, in order.
pub(crate) async fn received(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| format!("{} {}", request.method, request.url.path()))
        .collect()
}
