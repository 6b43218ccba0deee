//! # CRD Generator
//!
//! Prints the CustomResourceDefinitions this controller works with as a
//! multi-document YAML stream.
//!
//! ```bash
//! cargo run --bin crdgen > config/crd/operandbindinfo.yaml
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use kube::core::CustomResourceExt;
use operand_bindinfo_controller::crd::{OperandBindInfo, OperandRegistry, OperandRequest};

fn main() -> Result<(), serde_yaml::Error> {
    let crds = [
        OperandBindInfo::crd(),
        OperandRegistry::crd(),
        OperandRequest::crd(),
    ];
    for crd in &crds {
        print!("---\n{}", serde_yaml::to_string(crd)?);
    }
    Ok(())
}
