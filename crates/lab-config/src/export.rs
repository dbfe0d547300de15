//! Rendering a resolved environment into consumer formats

use std::fmt::{self, Write as _};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::{Environment, Host};

/// Canonical names of every export format, in display order.
pub const SUPPORTED_FORMATS: [&str; 5] = ["json", "yaml", "nix", "helm", "terraform"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Yaml,
    Nix,
    Helm,
    Terraform,
}

impl ExportFormat {
    pub fn name(self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Yaml => "yaml",
            ExportFormat::Nix => "nix",
            ExportFormat::Helm => "helm",
            ExportFormat::Terraform => "terraform",
        }
    }

    /// Render `env` in this format.
    pub fn render(self, env: &Environment) -> Result<String> {
        match self {
            ExportFormat::Json => {
                let mut out = serde_json::to_string_pretty(env)
                    .map_err(|e| self.render_error(env, e))?;
                out.push('\n');
                Ok(out)
            }
            ExportFormat::Yaml => serde_yaml::to_string(env).map_err(|e| self.render_error(env, e)),
            ExportFormat::Nix => Ok(render_nix(env)),
            ExportFormat::Helm => Ok(render_helm(env)),
            ExportFormat::Terraform => Ok(render_terraform(env)),
        }
    }
}

impl ExportFormat {
    fn render_error(self, env: &Environment, e: impl fmt::Display) -> Error {
        Error::Render {
            name: env.name.clone(),
            format: self.name(),
            message: e.to_string(),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "yaml" => Ok(ExportFormat::Yaml),
            "nix" => Ok(ExportFormat::Nix),
            "helm" => Ok(ExportFormat::Helm),
            "terraform" | "tf" => Ok(ExportFormat::Terraform),
            other => Err(Error::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn header(env: &Environment, format: ExportFormat) -> String {
    format!(
        "# Generated from environment: {name}\n\
         # Do not edit directly - regenerate with: lab config export {name} {format}\n",
        name = env.name,
    )
}

// Writing into a String cannot fail, so the fmt::Results below are discarded.

fn render_nix(env: &Environment) -> String {
    let net = &env.cluster.networks;
    let mut out = header(env, ExportFormat::Nix);
    let _ = write!(
        out,
        r#"{{
  environment = {{
    name = "{name}";
    domain = "{domain}";
    timezone = "{timezone}";
  }};

  networks = {{
    hostCidr = "{host}";
    podCidr = "{pod}";
    serviceCidr = "{service}";
  }};

  hosts = {{
"#,
        name = env.name,
        domain = env.cluster.domain,
        timezone = env.cluster.timezone,
        host = net.host_cidr,
        pod = net.pod_cidr,
        service = net.service_cidr,
    );
    for host in &env.hosts {
        nix_host(&mut out, host);
    }
    out.push_str("  };\n}\n");
    out
}

fn nix_host(out: &mut String, host: &Host) {
    let _ = writeln!(out, "    {} = {{", host.name);
    let _ = writeln!(out, "      ip = \"{}\";", host.ip);
    out.push_str("      k3s = {\n");
    let _ = writeln!(out, "        role = \"{}\";", host.k3s.role);
    if host.k3s.cluster_init {
        out.push_str("        clusterInit = true;\n");
    }
    if let Some(addr) = &host.k3s.server_addr {
        let _ = writeln!(out, "        serverAddr = \"{addr}\";");
    }
    out.push_str("      };\n");
    if !host.modules.is_empty() {
        out.push_str("      modules = [\n");
        for module in &host.modules {
            let _ = writeln!(out, "        \"{module}\"");
        }
        out.push_str("      ];\n");
    }
    out.push_str("    };\n");
}

fn render_helm(env: &Environment) -> String {
    let net = &env.cluster.networks;
    let mut out = header(env, ExportFormat::Helm);
    let _ = write!(
        out,
        "\nglobal:\n  domain: {}\n  timezone: {}\n\nnetwork:\n  hostCidr: {}\n  podCidr: {}\n  serviceCidr: {}\n",
        env.cluster.domain, env.cluster.timezone, net.host_cidr, net.pod_cidr, net.service_cidr,
    );
    out
}

fn render_terraform(env: &Environment) -> String {
    let net = &env.cluster.networks;
    let mut out = header(env, ExportFormat::Terraform);
    let _ = write!(
        out,
        r#"
environment = "{name}"
domain      = "{domain}"
timezone    = "{timezone}"

network = {{
  host_cidr    = "{host}"
  pod_cidr     = "{pod}"
  service_cidr = "{service}"
}}

hosts = {{
"#,
        name = env.name,
        domain = env.cluster.domain,
        timezone = env.cluster.timezone,
        host = net.host_cidr,
        pod = net.pod_cidr,
        service = net.service_cidr,
    );
    for host in &env.hosts {
        let _ = writeln!(out, "  {} = {{", host.name);
        let _ = writeln!(out, "    ip          = \"{}\"", host.ip);
        let _ = writeln!(out, "    k3s_role    = \"{}\"", host.k3s.role);
        if host.k3s.cluster_init {
            out.push_str("    cluster_init = true\n");
        }
        if let Some(addr) = &host.k3s.server_addr {
            let _ = writeln!(out, "    server_addr = \"{addr}\"");
        }
        out.push_str("  }\n");
    }
    out.push_str("}\n");
    out
}
