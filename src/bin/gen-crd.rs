use kanta::crd::manifest::{all_crds, WebhookService};
use kanta::server::config::{DEFAULT_NAMESPACE, DEFAULT_SERVICE_NAME, DEFAULT_WEBHOOK_PORT};

fn main() -> anyhow::Result<()> {
    // Emits one JSON document per CRD, separated by `---`, which kubectl
    // reads as a YAML stream:
    //   cargo run --bin gen-crd | kubectl apply -f -
    let service = WebhookService {
        name: DEFAULT_SERVICE_NAME.to_string(),
        namespace: DEFAULT_NAMESPACE.to_string(),
        port: i32::from(DEFAULT_WEBHOOK_PORT),
    };

    for crd in all_crds(&service) {
        println!("---");
        println!("{}", serde_json::to_string_pretty(&crd)?);
    }
    Ok(())
}
