use lbd_auth::{Account, CollisionSignal, PendingCredential, ProviderIdentity};

pub const EMAIL: &str = "u@x.com";

pub fn account(id: &str, providers: &[ProviderIdentity]) -> Account {
    Account {
        id: id.to_string(),
        display_name: Some("Test User".to_string()),
        email: Some(EMAIL.to_string()),
        photo_url: None,
        providers: providers.iter().map(|p| p.as_str().to_string()).collect(),
    }
}

pub fn credential(provider: ProviderIdentity) -> PendingCredential {
    PendingCredential {
        provider: provider.as_str().to_string(),
        post_body: format!("access_token=tok-{}&providerId={}", provider.display_name(), provider),
    }
}

/// GitHub sign-in collided with an account that owns `EMAIL`
pub fn github_collision() -> CollisionSignal {
    CollisionSignal::new(EMAIL)
        .with_attempted_provider(ProviderIdentity::GitHub)
        .with_credential(credential(ProviderIdentity::GitHub))
}
