use std::{
    env,
    net::{Ipv4Addr, SocketAddr},
};

use crate::codec::ihash;

/// Variable de entorno que pisa la URL del coordinador en workers y cliente.
pub const COORDINATOR_URL_ENV: &str = "MR_COORDINATOR_URL";

const BASE_PORT: u16 = 20_000;
const PORT_SPAN: u32 = 20_000;

/// Usuario que lanza el proceso (USER, luego LOGNAME).
fn current_user() -> String {
    env::var("USER")
        .or_else(|_| env::var("LOGNAME"))
        .unwrap_or_else(|_| "mr".to_string())
}

/// Puerto por usuario, para que jobs de usuarios distintos en la misma
/// máquina no choquen.
pub fn port_for_user(user: &str) -> u16 {
    BASE_PORT + (ihash(user) % PORT_SPAN) as u16
}

/// Dirección en la que escucha el coordinador por defecto (loopback).
pub fn default_bind_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, port_for_user(&current_user())))
}

/// URL base del coordinador:
/// - MR_COORDINATOR_URL si está definida
/// - si no, http://127.0.0.1:<puerto del usuario>
pub fn coordinator_base_url() -> String {
    env::var(COORDINATOR_URL_ENV)
        .unwrap_or_else(|_| format!("http://{}", default_bind_addr()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_for_user_es_estable_y_en_rango() {
        let p = port_for_user("alice");
        assert_eq!(p, port_for_user("alice"));
        assert!((20_000..40_000).contains(&p));
    }

    #[test]
    fn usuarios_distintos_suelen_tener_puertos_distintos() {
        assert_ne!(port_for_user("alice"), port_for_user("bob"));
    }
}
