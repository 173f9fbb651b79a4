use super::*;

struct EnvGuard(&'static str);

impl EnvGuard {
    fn set(key: &'static str, value: &str) -> Self {
        // SAFETY: tests mutating the environment run in this process only;
        // the guard restores isolation by removing the key on drop.
        unsafe { std::env::set_var(key, value) };
        Self(key)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe { std::env::remove_var(self.0) };
    }
}

#[test]
fn env_bool_parses_truthy_and_falsy_spellings() {
    for (raw, expected) in [
        ("1", Some(true)),
        ("true", Some(true)),
        ("YES", Some(true)),
        (" on ", Some(true)),
        ("0", Some(false)),
        ("False", Some(false)),
        ("no", Some(false)),
        ("off", Some(false)),
        ("maybe", None),
    ] {
        let _guard = EnvGuard::set("PLAYROOM_TEST_ENV_BOOL", raw);
        assert_eq!(env_bool("PLAYROOM_TEST_ENV_BOOL"), expected, "raw = {raw:?}");
    }
}

#[test]
fn env_bool_is_none_when_unset() {
    assert_eq!(env_bool("PLAYROOM_TEST_ENV_BOOL_UNSET"), None);
}

#[test]
fn session_cookie_is_http_only_and_scoped_to_root() {
    let cookie = session_cookie("tok".to_owned());
    assert_eq!(cookie.name(), COOKIE_NAME);
    assert_eq!(cookie.value(), "tok");
    assert_eq!(cookie.path(), Some("/"));
    assert_eq!(cookie.http_only(), Some(true));
}
