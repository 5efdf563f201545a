#[async_trait::async_trait]
pub trait ModuleClient: Clone + Send + Sync + 'static {
    const NAME: &'static str;
    type Client;

    fn validate_env() -> bool;
    async fn setup_connection() -> anyhow::Result<Self>;

    fn get_client(&self) -> &Self::Client;
}

/// Declares a cheaply clonable wrapper around an external client.
///
/// The setup block is an async expression yielding `anyhow::Result<$client_type>`;
/// required environment variables are checked before it runs.
#[macro_export]
macro_rules! define_module_client {
    {
        (struct $struct_name:ident, $client_name:expr)
        client_type: $client_type:ty,
        env: [ $( $env_var:literal ),* ],
        setup: $setup_logic:expr
    } => {
        #[derive(Clone)]
        pub struct $struct_name {
            client: std::sync::Arc<$client_type>,
        }

        impl $struct_name {
            pub fn from_client(client: $client_type) -> Self {
                Self { client: std::sync::Arc::new(client) }
            }
        }

        #[async_trait::async_trait]
        impl $crate::ModuleClient for $struct_name {
            const NAME: &'static str = $client_name;
            type Client = std::sync::Arc<$client_type>;

            fn validate_env() -> bool {
                const ENV_VARS: &'static [&'static str] = &[ $( $env_var ),* ];
                let missing_vars: Vec<&'static str> = ENV_VARS.iter().cloned().filter(|var| std::env::var(var).is_err()).collect();

                if missing_vars.is_empty() {
                    return true;
                }

                let vars_str = missing_vars.join(", ");
                tracing::error!("[Client: {}] Required environment variables are not set: [{}]", $client_name, &vars_str);
                false
            }

            async fn setup_connection() -> anyhow::Result<Self> {
                if !Self::validate_env() {
                    anyhow::bail!("[Client: {}] Required environment variables are not set. Check logs for details.", $client_name);
                }

                let client_instance: $client_type = $setup_logic.await?;
                tracing::info!("[Client: {}] connection ready", $client_name);
                Ok(Self::from_client(client_instance))
            }

            fn get_client(&self) -> &Self::Client {
                &self.client
            }
        }
    }
}
