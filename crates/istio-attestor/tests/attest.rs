//! End-to-end attestation against a mocked Kubernetes API server.

use istio_attestor::{
    channel, AttestationData, AttestationRequest, AttestationResponse, ErrorKind, IstioAttestor,
    PLUGIN_NAME,
};
use serde_json::json;
use std::path::PathBuf;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_REVIEWS: &str = "/apis/authentication.k8s.io/v1/tokenreviews";

fn write_kubeconfig(dir: &tempfile::TempDir, server: &str) -> PathBuf {
    let path = dir.path().join("kubeconfig");
    std::fs::write(
        &path,
        format!(
            r"
apiVersion: v1
kind: Config
current-context: spire
clusters:
- name: local
  cluster:
    server: {server}
contexts:
- name: spire
  context:
    cluster: local
    user: spire-server
users:
- name: spire-server
  user:
    token: spire-server-token
"
        ),
    )
    .unwrap();
    path
}

fn configured_attestor(kubeconfig: &std::path::Path) -> IstioAttestor {
    let attestor = IstioAttestor::new();
    attestor
        .configure(&format!("k8s_config_path = {:?}", kubeconfig.display().to_string()))
        .unwrap();
    attestor
}

fn request(token: &str, trust_domain: &str) -> AttestationRequest {
    let payload = json!({ "token": token, "trustDomain": trust_domain });
    AttestationRequest::new(AttestationData::new(
        PLUGIN_NAME,
        serde_json::to_vec(&payload).unwrap(),
    ))
}

#[tokio::test]
async fn attests_agent_through_token_review() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_REVIEWS))
        .and(header("authorization", "Bearer spire-server-token"))
        .and(body_partial_json(json!({ "spec": { "token": "agent.jwt" } })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "apiVersion": "authentication.k8s.io/v1",
            "kind": "TokenReview",
            "spec": { "token": "agent.jwt" },
            "status": {
                "authenticated": true,
                "user": {
                    "username": "system:serviceaccount:payments:checkout-sa",
                    "groups": ["system:serviceaccounts", "system:serviceaccounts:payments"]
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let attestor = configured_attestor(&write_kubeconfig(&dir, &server.uri()));

    let (mut stream, mut peer) = channel();
    peer.send(request("Bearer agent.jwt", "example.org"))
        .await
        .unwrap();

    attestor.attest(&mut stream).await.unwrap();

    assert_eq!(
        peer.recv().await,
        Some(AttestationResponse {
            valid: true,
            base_spiffe_id: "spiffe://example.org/ns/payments/sa/checkout-sa".into(),
        })
    );
}

#[tokio::test]
async fn rejected_token_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_REVIEWS))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "spec": {},
            "status": {
                "authenticated": true,
                "user": {
                    "username": "jane@example.org",
                    "groups": ["system:authenticated", "developers"]
                }
            }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let attestor = configured_attestor(&write_kubeconfig(&dir, &server.uri()));

    let (mut stream, mut peer) = channel();
    peer.send(request("user.jwt", "example.org")).await.unwrap();

    let err = attestor.attest(&mut stream).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotServiceAccount);

    drop(stream);
    assert_eq!(peer.recv().await, None);
}

#[tokio::test]
async fn reconfigure_switches_clusters() {
    let old_cluster = MockServer::start().await;
    let new_cluster = MockServer::start().await;
    for (cluster, namespace) in [(&old_cluster, "old-ns"), (&new_cluster, "new-ns")] {
        Mock::given(method("POST"))
            .and(path(TOKEN_REVIEWS))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "spec": {},
                "status": {
                    "authenticated": true,
                    "user": {
                        "username": format!("system:serviceaccount:{namespace}:agent"),
                        "groups": ["system:serviceaccounts"]
                    }
                }
            })))
            .mount(cluster)
            .await;
    }

    let old_dir = tempfile::tempdir().unwrap();
    let new_dir = tempfile::tempdir().unwrap();
    let attestor = configured_attestor(&write_kubeconfig(&old_dir, &old_cluster.uri()));
    attestor
        .configure(&format!(
            "k8s_config_path = {:?}",
            write_kubeconfig(&new_dir, &new_cluster.uri())
                .display()
                .to_string()
        ))
        .unwrap();

    let (mut stream, mut peer) = channel();
    peer.send(request("agent.jwt", "mesh.local")).await.unwrap();
    attestor.attest(&mut stream).await.unwrap();

    let response = peer.recv().await.unwrap();
    assert_eq!(response.base_spiffe_id, "spiffe://mesh.local/ns/new-ns/sa/agent");
}
