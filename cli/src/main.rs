/*
 * main.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Portacarte, a mutual-TLS object storage upload client.
 *
 * Portacarte is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Portacarte is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Portacarte.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Command-line glue around the core client: parse arguments, build the
//! ObjectMetadata JSON, run one upload, print the status code.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use portacarte_core::{Client, CredentialFile, HostnamePolicy, UploadError};

#[derive(Parser, Debug)]
#[command(
    name = "portacarte",
    version,
    about = "Upload a file with metadata to an object-drive endpoint over mutual TLS"
)]
struct Cli {
    /// Endpoint base URL, e.g. https://host:8080/services/object-drive/0.0
    endpoint: String,

    /// File to upload
    file: PathBuf,

    /// Identity container format (PKCS12 or JKS)
    #[arg(long, default_value = "PKCS12")]
    identity_format: String,

    /// Identity container path (client key + certificate chain)
    #[arg(long)]
    identity: PathBuf,

    /// Identity container passphrase
    #[arg(long)]
    identity_pass: String,

    /// Trust container format (PKCS12 or JKS)
    #[arg(long, default_value = "PKCS12")]
    trust_format: String,

    /// Trust container path (CA certificates for the server)
    #[arg(long)]
    trust: PathBuf,

    /// Trust container passphrase
    #[arg(long)]
    trust_pass: String,

    /// MIME type for the file part
    #[arg(long, default_value = "application/octet-stream")]
    mime_type: String,

    /// Object name; defaults to the file name
    #[arg(long)]
    name: Option<String>,

    /// Description stored in the object metadata
    #[arg(long, default_value = "")]
    description: String,

    /// ACM JSON string to embed in the metadata, passed through verbatim
    #[arg(long)]
    acm: Option<String>,

    /// Accept any server host name (the certificate chain is still validated)
    #[arg(long)]
    insecure_any_hostname: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(status) => {
            println!("responseCode: {}", status);
            if (200..300).contains(&status) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("upload failed: {}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<u16, UploadError> {
    let name = match &cli.name {
        Some(n) => n.clone(),
        None => cli
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string()),
    };

    let mut metadata = serde_json::json!({
        "typeName": "File",
        "name": name,
        "description": cli.description,
    });
    if let Some(acm) = &cli.acm {
        metadata["acm"] = serde_json::Value::String(acm.clone());
    }
    let metadata_bytes = metadata.to_string().into_bytes();

    let policy = if cli.insecure_any_hostname {
        tracing::warn!("server host name verification disabled");
        HostnamePolicy::AcceptAnyName
    } else {
        HostnamePolicy::Verify
    };

    let client = Client::open(
        &cli.endpoint,
        &CredentialFile::new(&cli.identity_format, &cli.identity, &cli.identity_pass),
        &CredentialFile::new(&cli.trust_format, &cli.trust, &cli.trust_pass),
        policy,
    )
    .await?;

    let content = tokio::fs::File::open(&cli.file).await?;
    client
        .create_object(&name, &cli.mime_type, &metadata_bytes[..], content)
        .await
}

/// Distinct exit codes so scripts can tell credential problems from network
/// problems from local I/O problems.
fn exit_code_for(e: &UploadError) -> u8 {
    match e {
        UploadError::CredentialFormat(_) | UploadError::CredentialDecode(_) => 2,
        UploadError::Configuration(_) => 3,
        UploadError::Connection(_) => 4,
        UploadError::Io(_) => 5,
        UploadError::Part(_) | UploadError::Protocol(_) => 6,
    }
}
