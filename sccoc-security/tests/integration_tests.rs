//! Integration tests for constraint providers and admission

use sccoc_core::{Error, SecurityContext};
use sccoc_namespace::{InMemoryStore, NamespaceConfig, NamespaceStore, create_for_test, test_pod};
use sccoc_security::bootstrap::{RESTRICTED, find};
use sccoc_security::{
    SCC_ANNOTATION, UserInfo, admit, bootstrap_constraints, create_provider_from_constraint,
    default_service_account, prefer_for_service_account, revoke_cluster_admin_anyuid,
};

const IMAGE: &str = "docker.io/centos:latest";

#[tokio::test]
async fn test_restricted_provider_on_test_namespace() {
    let store = InMemoryStore::new();
    let ns = create_for_test(&NamespaceConfig::default()).unwrap();
    let constraints = bootstrap_constraints("openshift-infra");
    let scc = find(&constraints, RESTRICTED).unwrap();

    let (provider, _) = create_provider_from_constraint(&ns.name, Some(&ns), scc, &store)
        .await
        .unwrap();

    let pod = test_pod(IMAGE, "tcp", "tmp", &ns.name, 12000);
    let (psc, _) = provider.create_pod_security_context(&pod);
    let sc = provider.create_container_security_context(&pod, &pod.spec.containers[0]);

    assert_eq!(psc.fs_group, Some(1_000_100_000));
    assert_eq!(
        psc.selinux_options.and_then(|o| o.level).as_deref(),
        Some("s9:z0,z1")
    );
    assert_eq!(sc.run_as_user, Some(1_000_100_000));
    assert_eq!(sc.privileged, Some(false));
    assert_eq!(
        sc.capabilities.unwrap().drop,
        ["KILL", "MKNOD", "SETGID", "SETUID"]
    );
}

#[tokio::test]
async fn test_admission_for_authenticated_user() {
    let store = InMemoryStore::new();
    let ns = create_for_test(&NamespaceConfig::default()).unwrap();
    let pod = test_pod(IMAGE, "tcp", "tmp", &ns.name, 12000);
    let user = UserInfo::new("alice").with_group("system:authenticated");

    let admitted = admit(
        &pod,
        Some(&ns),
        &bootstrap_constraints("openshift-infra"),
        Some(&user),
        &store,
    )
    .await
    .unwrap();

    assert_eq!(admitted.scc, "restricted");
    assert_eq!(
        admitted.pod.annotations.get(SCC_ANNOTATION).map(String::as_str),
        Some("restricted")
    );
}

#[tokio::test]
async fn test_admission_prefers_anyuid_for_cluster_admins() {
    let store = InMemoryStore::new();
    store
        .create(create_for_test(&NamespaceConfig::default().with_prefix("admin")).unwrap())
        .await
        .unwrap();
    let ns_name = {
        let ns = create_for_test(&NamespaceConfig::default()).unwrap();
        let name = ns.name.clone();
        store.create(ns).await.unwrap();
        name
    };
    let pod = test_pod(IMAGE, "tcp", "tmp", &ns_name, 12000);
    let user = UserInfo::new("root").with_group("system:cluster-admins");

    let admitted = admit(
        &pod,
        None,
        &bootstrap_constraints("openshift-infra"),
        Some(&user),
        &store,
    )
    .await
    .unwrap();

    assert_eq!(admitted.scc, "anyuid");
    let sc = admitted.pod.spec.containers[0]
        .security_context
        .as_ref()
        .unwrap();
    assert_eq!(sc.run_as_user, None);
}

#[tokio::test]
async fn test_host_network_needs_privileged_grant() {
    let store = InMemoryStore::new();
    let ns = create_for_test(&NamespaceConfig::default()).unwrap();
    let mut pod = test_pod(IMAGE, "tcp", "tmp", &ns.name, 12000);
    pod.spec.host_network = true;
    let constraints = bootstrap_constraints("openshift-infra");

    let admin = UserInfo::new("root").with_group("system:cluster-admins");
    let admitted = admit(&pod, Some(&ns), &constraints, Some(&admin), &store)
        .await
        .unwrap();
    assert_eq!(admitted.scc, "privileged");

    let user = UserInfo::new("alice").with_group("system:authenticated");
    let err = admit(&pod, Some(&ns), &constraints, Some(&user), &store)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
    assert!(err.to_string().contains("Host network is not allowed to be used"));
}

#[tokio::test]
async fn test_requested_root_rejected_by_restricted() {
    let store = InMemoryStore::new();
    let ns = create_for_test(&NamespaceConfig::default()).unwrap();
    let mut pod = test_pod(IMAGE, "tcp", "tmp", &ns.name, 12000);
    pod.spec.containers[0].security_context = Some(SecurityContext {
        run_as_user: Some(0),
        ..SecurityContext::default()
    });

    let user = UserInfo::new("alice").with_group("system:authenticated");
    let err = admit(
        &pod,
        Some(&ns),
        &bootstrap_constraints("openshift-infra"),
        Some(&user),
        &store,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("runAsUser"));
}

#[tokio::test]
async fn test_no_granted_constraints() {
    let store = InMemoryStore::new();
    let ns = create_for_test(&NamespaceConfig::default()).unwrap();
    let pod = test_pod(IMAGE, "tcp", "tmp", &ns.name, 12000);
    let nobody = UserInfo::new("nobody");

    let err = admit(
        &pod,
        Some(&ns),
        &bootstrap_constraints("openshift-infra"),
        Some(&nobody),
        &store,
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("no providers available"));
}

#[tokio::test]
async fn test_any_identity_tries_every_constraint() {
    let store = InMemoryStore::new();
    let ns = create_for_test(&NamespaceConfig::default()).unwrap();
    let pod = test_pod(IMAGE, "tcp", "tmp", &ns.name, 12000);

    let admitted = admit(
        &pod,
        Some(&ns),
        &bootstrap_constraints("openshift-infra"),
        None,
        &store,
    )
    .await
    .unwrap();
    assert_eq!(admitted.scc, "anyuid");
}

#[tokio::test]
async fn test_preferred_constraint_wins_admission() {
    let store = InMemoryStore::new();
    let ns = create_for_test(&NamespaceConfig::default()).unwrap();
    let pod = test_pod(IMAGE, "tcp", "tmp", &ns.name, 12000);
    let mut constraints = bootstrap_constraints(&ns.name);

    assert!(prefer_for_service_account(&mut constraints, "hostaccess", &ns.name).unwrap());
    let user =
        UserInfo::new(default_service_account(&ns.name)).with_group("system:authenticated");
    let admitted = admit(&pod, Some(&ns), &constraints, Some(&user), &store)
        .await
        .unwrap();
    assert_eq!(admitted.scc, "hostaccess");
}

#[tokio::test]
async fn test_cluster_admins_without_anyuid() {
    let store = InMemoryStore::new();
    let ns = create_for_test(&NamespaceConfig::default()).unwrap();
    let pod = test_pod(IMAGE, "tcp", "tmp", &ns.name, 12000);
    let mut constraints = bootstrap_constraints(&ns.name);
    let admin = UserInfo::new("root").with_group("system:cluster-admins");

    let admitted = admit(&pod, Some(&ns), &constraints, Some(&admin), &store)
        .await
        .unwrap();
    assert_eq!(admitted.scc, "anyuid");

    assert!(revoke_cluster_admin_anyuid(&mut constraints, "privileged"));
    let admitted = admit(&pod, Some(&ns), &constraints, Some(&admin), &store)
        .await
        .unwrap();
    assert_eq!(admitted.scc, "privileged");
}
