//! Internal services and external ingress routes.

use super::{object_meta, selector_labels};
use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

/// ClusterIP service exposing one workload on its single port
pub(super) fn cluster_ip_service(namespace: &str, component: &str, port: i32) -> Service {
    Service {
        metadata: object_meta(namespace, component),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(selector_labels(component)),
            ports: Some(vec![ServicePort {
                port,
                target_port: Some(IntOrString::Int(port)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Ingress route mapping one external host to one internal service
pub(super) fn ingress_route(
    namespace: &str,
    name: &str,
    host: &str,
    service: &str,
    port: i32,
) -> Ingress {
    Ingress {
        metadata: object_meta(namespace, name),
        spec: Some(IngressSpec {
            rules: Some(vec![IngressRule {
                host: Some(host.to_string()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service.to_string(),
                                port: Some(ServiceBackendPort {
                                    number: Some(port),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_targets_workload_port() {
        let svc = cluster_ip_service("tenant-x", "backend", 3001);
        let spec = svc.spec.expect("spec");
        assert_eq!(spec.type_.as_deref(), Some("ClusterIP"));
        let ports = spec.ports.expect("ports");
        assert_eq!(ports[0].port, 3001);
        assert_eq!(ports[0].target_port, Some(IntOrString::Int(3001)));
        assert_eq!(
            spec.selector.expect("selector").get("app").map(String::as_str),
            Some("backend")
        );
    }

    #[test]
    fn ingress_routes_host_to_service() {
        let ing = ingress_route("tenant-x", "cdn", "cdn.x.cluster.example", "minio", 9000);
        let rules = ing.spec.expect("spec").rules.expect("rules");
        assert_eq!(rules[0].host.as_deref(), Some("cdn.x.cluster.example"));
        let backend = rules[0]
            .http
            .as_ref()
            .expect("http")
            .paths[0]
            .backend
            .service
            .as_ref()
            .expect("service backend");
        assert_eq!(backend.name, "minio");
        assert_eq!(
            backend.port.as_ref().and_then(|p| p.number),
            Some(9000)
        );
    }
}
