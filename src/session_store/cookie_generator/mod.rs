use rand::distributions::{Alphanumeric, DistString};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Length of every session cookie issued by this system, in characters.
pub const COOKIE_LENGTH: usize = 60;

/// A type with the ability to generate cookies.
pub trait SessionCookieGenerator: Send + Sync {
    /// Generate a cookie, i.e. a string of [`COOKIE_LENGTH`] characters that is a valid HTTP cookie value.
    fn generate_cookie(&self) -> String;
}

/// The default cookie generator with focus on security.
/// It uses [rand::thread_rng] as a random source and the [Alphanumeric] distribution to generate cookie strings.
/// This gives `log_2(26+26+10) ≥ 5.95` bits of entropy per character, more than 350 bits per cookie.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultSessionCookieGenerator;

impl SessionCookieGenerator for DefaultSessionCookieGenerator {
    fn generate_cookie(&self) -> String {
        let mut cookie = String::with_capacity(COOKIE_LENGTH);
        Alphanumeric.append_string(&mut rand::thread_rng(), &mut cookie, COOKIE_LENGTH);
        cookie
    }
}

/// A debug cookie generator that generates an ascending sequence of integers, formatted as strings padded with zeroes.
///
/// Two generators created with [`Default`] produce the same sequence, which lets tests predict the cookies a store will issue.
#[derive(Debug, Default)]
pub struct DebugSessionCookieGenerator {
    next_index: AtomicUsize,
}

impl SessionCookieGenerator for DebugSessionCookieGenerator {
    fn generate_cookie(&self) -> String {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        format!("{index:0width$}", width = COOKIE_LENGTH)
    }
}

impl<T: SessionCookieGenerator + ?Sized> SessionCookieGenerator for Arc<T> {
    fn generate_cookie(&self) -> String {
        (**self).generate_cookie()
    }
}
