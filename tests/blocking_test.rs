use std::sync::Arc;

use rabbitmq_named_clients::{error::RegistryError, OptionsSource, Registry};

mod common;

use common::*;

fn localhost() -> OptionsSource {
    OptionsSource::configure(|options| {
        options.endpoint("localhost");
    })
}

#[test]
fn blocking_resolution_outside_a_runtime() {
    let amqp = TestAmqp::default();
    let registry = Registry::builder()
        .add_connection("test", localhost())
        .add_stream_system("test", localhost())
        .build(amqp.clone(), TestStream::default())
        .unwrap();

    let first = registry.connection_blocking("test").unwrap();
    let second = registry.connection_blocking("test").unwrap();
    let system = registry.stream_system_blocking("test").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(1, amqp.connections());
    assert_eq!("localhost:5552", system.config.endpoints[0].to_string());
}

#[tokio::test(flavor = "multi_thread")]
async fn blocking_resolution_inside_a_multi_thread_runtime() {
    let amqp = TestAmqp::default();
    let registry = Registry::builder()
        .add_connection("test", localhost())
        .build_amqp(amqp.clone())
        .unwrap();

    let factory = registry.connection_factory_blocking("test").unwrap();
    let connection = registry.connection("test").await.unwrap();

    assert!(Arc::ptr_eq(
        &factory,
        &registry.connection_factory("test").await.unwrap()
    ));
    assert_eq!(1, amqp.factories());
    assert_eq!("localhost", connection.endpoints[0].host_name);
}

#[tokio::test(flavor = "current_thread")]
async fn blocking_resolution_is_refused_on_a_current_thread_runtime() {
    let amqp = TestAmqp::default();
    let registry = Registry::builder()
        .add_connection("test", localhost())
        .build_amqp(amqp.clone())
        .unwrap();

    let err = registry.connection_blocking("test").unwrap_err();

    assert!(matches!(err, RegistryError::BlockingOnCurrentThread));
    assert_eq!(0, amqp.factories());
    assert!(registry.connection("test").await.is_ok());
}
