use anyhow::{anyhow, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use discovery_client::descriptor::split_method_identifier;
use discovery_client::discovery::discovery_url;
use discovery_client::{Api, ClientConfig, DiscoveryDocument, HttpClient, Transport};
use serde_json::{json, Map, Value};
use std::{env, fs, io::Read};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

struct Output {
    pretty: bool,
    raw: bool,
    verbose: bool,
}

impl Output {
    fn print(&self, value: &Value) -> Result<()> {
        if self.pretty {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", serde_json::to_string(value)?);
        }
        Ok(())
    }

    fn trace(&self, line: &str) {
        if self.verbose {
            eprintln!("> {line}");
        }
    }
}

fn run() -> Result<()> {
    let matches = build_cli().get_matches();

    let discovery_url_arg = matches
        .get_one::<String>("discovery-url")
        .cloned()
        .or_else(|| env::var("DISCOVERY_URL").ok());
    let timeout = matches
        .get_one::<String>("timeout")
        .cloned()
        .or_else(|| env::var("DISCOVERY_TIMEOUT").ok())
        .map(|v| v.parse::<u64>().context("invalid --timeout"))
        .transpose()?;

    let mut config = ClientConfig::default().with_timeout(timeout);
    if let Some(url) = discovery_url_arg {
        config = config.with_discovery_url(url);
    }
    for (name, value) in parse_header_args(matches.get_many::<String>("header"))? {
        config = config.with_header(name, value);
    }

    let output = Output {
        pretty: matches.get_flag("pretty"),
        raw: matches.get_flag("raw"),
        verbose: matches.get_flag("verbose"),
    };

    let client = HttpClient::new(&config).context("build http client")?;

    let (name, sub) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("command required"))?;
    let api_name = sub
        .get_one::<String>("api")
        .ok_or_else(|| anyhow!("api name required"))?;
    let doc = load_document(&client, &config, api_name, &output)?;

    match name {
        "list" => handle_list(&doc, sub, &output),
        "describe" => handle_describe(&doc, sub, &output),
        "tree" => handle_tree(&doc, &output),
        "request" => handle_request(&client, &doc, sub, &output),
        other => Err(anyhow!("unknown command {other}")),
    }
}

fn build_cli() -> Command {
    let api_arg = || Arg::new("api").required(true).help("API name, e.g. buzz");
    let method_arg = || {
        Arg::new("method")
            .required(true)
            .help("Method identifier: resourceName.methodName")
    };
    let version_arg = || {
        Arg::new("api-version")
            .long("api-version")
            .value_name("VERSION")
            .help("API version (defaults to the first one in the document)")
    };
    let json_arg = || {
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Emit machine-readable JSON")
    };

    Command::new("discovery")
        .about("Load API discovery documents and call their methods")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("discovery-url")
                .long("discovery-url")
                .value_name("URL")
                .global(true)
                .help("Discovery describe endpoint (DISCOVERY_URL)"),
        )
        .arg(
            Arg::new("header")
                .long("header")
                .value_name("NAME:VALUE")
                .global(true)
                .action(ArgAction::Append)
                .help("Extra header (repeatable)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECS")
                .global(true)
                .help("HTTP timeout in seconds (DISCOVERY_TIMEOUT)"),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Pretty-print JSON output"),
        )
        .arg(
            Arg::new("raw")
                .long("raw")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Return status + headers + body"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Trace HTTP requests to stderr"),
        )
        .subcommand(
            Command::new("list")
                .about("List versions, resources and methods")
                .arg(api_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("describe")
                .about("Describe a specific method")
                .arg(api_arg())
                .arg(method_arg())
                .arg(version_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("tree")
                .about("Show the full API definition as JSON")
                .arg(api_arg()),
        )
        .subcommand(
            Command::new("request")
                .about("Build and send a request for a method")
                .arg(api_arg())
                .arg(method_arg())
                .arg(version_arg())
                .arg(
                    Arg::new("param")
                        .long("param")
                        .short('p')
                        .value_name("KEY=VALUE")
                        .action(ArgAction::Append)
                        .help("Method parameter (repeatable)"),
                )
                .arg(
                    Arg::new("params")
                        .long("params")
                        .value_name("JSON|@file|@-")
                        .help("Method parameters as a JSON object"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Print the request instead of sending it"),
                ),
        )
}

fn load_document(
    client: &HttpClient,
    config: &ClientConfig,
    api_name: &str,
    output: &Output,
) -> Result<DiscoveryDocument> {
    output.trace(&format!(
        "GET {}",
        discovery_url(&config.discovery_url, api_name)?
    ));
    let doc = DiscoveryDocument::load_from(client, &config.discovery_url, api_name)
        .with_context(|| format!("load discovery document for {api_name}"))?;
    if doc.api_definition().is_empty() {
        eprintln!("warning: discovery document has no versions for {api_name}");
    }
    Ok(doc)
}

fn select_api<'a>(doc: &'a DiscoveryDocument, matches: &ArgMatches) -> Result<Api<'a>> {
    match matches.get_one::<String>("api-version") {
        Some(version) => doc
            .api(version)
            .ok_or_else(|| anyhow!("unknown version {version} for {}", doc.api_name())),
        None => doc
            .default_api()
            .ok_or_else(|| anyhow!("no versions defined for {}", doc.api_name())),
    }
}

fn handle_list(doc: &DiscoveryDocument, matches: &ArgMatches, output: &Output) -> Result<()> {
    if matches.get_flag("json") {
        let mut out = Vec::new();
        for (version, service) in doc.api_definition().iter() {
            let resources = sorted_keys(&service.resources)
                .into_iter()
                .map(|name| {
                    let methods = sorted_keys(&service.resources[name].methods);
                    json!({"resource": name, "methods": methods})
                })
                .collect::<Vec<_>>();
            out.push(json!({"version": version, "baseUrl": service.base_url, "resources": resources}));
        }
        return output.print(&Value::Array(out));
    }

    for (version, service) in doc.api_definition().iter() {
        println!("{} ({})", version, service.base_url);
        for name in sorted_keys(&service.resources) {
            println!("  {}", name);
            for method in sorted_keys(&service.resources[name].methods) {
                println!("    {}", method);
            }
        }
    }
    Ok(())
}

fn handle_describe(doc: &DiscoveryDocument, matches: &ArgMatches, output: &Output) -> Result<()> {
    let identifier = matches
        .get_one::<String>("method")
        .ok_or_else(|| anyhow!("method required"))?;
    let api = select_api(doc, matches)?;
    let method = api.service().method(identifier)?;

    if matches.get_flag("json") {
        return output.print(&serde_json::to_value(method)?);
    }

    let (resource, name) = split_method_identifier(identifier)?;
    println!("{} {} ({})", resource, name, api.version());
    println!("  method: {}", method.http_method);
    println!("  path: {}", method.path_url);
    println!("  url: {}", api.service().resource_url(identifier)?);
    if !method.parameters.is_empty() {
        println!("  params:");
        for param in sorted_keys(&method.parameters) {
            let flag = if method.parameters[param].required {
                "required"
            } else {
                "optional"
            };
            println!("    {}  ({})", param, flag);
        }
    }
    Ok(())
}

fn handle_tree(doc: &DiscoveryDocument, output: &Output) -> Result<()> {
    output.print(&json!({
        "api": doc.api_name(),
        "versions": doc.api_definition(),
    }))
}

fn handle_request(
    client: &HttpClient,
    doc: &DiscoveryDocument,
    matches: &ArgMatches,
    output: &Output,
) -> Result<()> {
    let identifier = matches
        .get_one::<String>("method")
        .ok_or_else(|| anyhow!("method required"))?;
    let api = select_api(doc, matches)?;

    let mut params = match matches.get_one::<String>("params") {
        Some(raw) => parse_params_object(&read_body_input(raw)?)?,
        None => Map::new(),
    };
    for (k, v) in parse_kv_args(matches.get_many::<String>("param"), "param")? {
        params.insert(k, Value::String(v));
    }

    let request = api.build_request(identifier, &params)?;
    if matches.get_flag("dry-run") {
        return output.print(&request.to_json());
    }

    output.trace(&format!("{} {}", request.method, request.url));
    let response = client.execute(&request).context("send request")?;

    let out = if output.raw {
        json!({
            "status": response.status,
            "headers": response.headers,
            "body": response.body,
        })
    } else {
        response.body
    };
    output.print(&out)?;

    if response.status >= 400 {
        return Err(anyhow!("http {}", response.status));
    }
    Ok(())
}

fn sorted_keys<V>(map: &std::collections::HashMap<String, V>) -> Vec<&str> {
    let mut keys = map.keys().map(String::as_str).collect::<Vec<_>>();
    keys.sort_unstable();
    keys
}

fn parse_params_object(raw: &str) -> Result<Map<String, Value>> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON params")?;
    match parsed {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow!("expected JSON object for --params")),
    }
}

fn read_body_input(value: &str) -> Result<String> {
    if value == "@-" || value == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    if let Some(path) = value.strip_prefix('@') {
        return fs::read_to_string(path).context("read params file");
    }
    Ok(value.to_string())
}

fn parse_header_args(
    values: Option<clap::parser::ValuesRef<'_, String>>,
) -> Result<Vec<(String, String)>> {
    parse_kv_args(values, "header")
}

fn parse_kv_args(
    values: Option<clap::parser::ValuesRef<'_, String>>,
    label: &str,
) -> Result<Vec<(String, String)>> {
    let mut out = Vec::new();
    let Some(values) = values else {
        return Ok(out);
    };
    for raw in values {
        if let Some((k, v)) = split_pair(raw) {
            out.push((k.to_string(), v.to_string()));
        } else {
            return Err(anyhow!("invalid {label}: {raw}"));
        }
    }
    Ok(out)
}

fn split_pair(value: &str) -> Option<(&str, &str)> {
    let idx = value.find([':', '='])?;
    Some((value[..idx].trim(), value[idx + 1..].trim()))
}
