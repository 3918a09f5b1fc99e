mod auth_headers;
mod kubeconfig;
