//! Absolute, signed callback URLs.
//!
//! Every transition's context (language, artifact, attempt) travels in the
//! query string of the next request, so link building and link verification
//! live side by side.

use crate::artifact::ArtifactName;
use crate::signing::ParamSigner;
use crate::Result;
use url::Url;

#[derive(Clone, Debug)]
pub struct Links {
    base: Url,
    signer: ParamSigner,
}

impl Links {
    pub fn new(base_url: &str, signer: ParamSigner) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self { base, signer })
    }

    fn route(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    pub fn set_language(&self) -> Result<String> {
        Ok(self.route("set_language")?.into())
    }

    pub fn ask_query(&self, lang: &str) -> Result<String> {
        let mut url = self.route("ask_query")?;
        let sig = self.signer.sign(&lang_params(lang));
        url.query_pairs_mut()
            .append_pair("lang", lang)
            .append_pair("sig", &sig);
        Ok(url.into())
    }

    pub fn process(&self, lang: &str) -> Result<String> {
        let mut url = self.route("process")?;
        let sig = self.signer.sign(&lang_params(lang));
        url.query_pairs_mut()
            .append_pair("lang", lang)
            .append_pair("sig", &sig);
        Ok(url.into())
    }

    pub fn play(&self, artifact: &ArtifactName, lang: &str, attempt: u32) -> Result<String> {
        let mut url = self.route("play")?;
        let file = artifact.file_name();
        let attempt = attempt.to_string();
        let sig = self.signer.sign(&poll_params(&file, lang, &attempt));
        url.query_pairs_mut()
            .append_pair("file", &file)
            .append_pair("lang", lang)
            .append_pair("attempt", &attempt)
            .append_pair("sig", &sig);
        Ok(url.into())
    }

    pub fn media(&self, artifact: &ArtifactName) -> Result<String> {
        Ok(self.route(&format!("media/{}", artifact.file_name()))?.into())
    }

    pub fn verify_lang(&self, lang: &str, sig: Option<&str>) -> bool {
        sig.is_some_and(|sig| self.signer.verify(&lang_params(lang), sig))
    }

    pub fn verify_poll(&self, file: &str, lang: &str, attempt: u32, sig: Option<&str>) -> bool {
        let attempt = attempt.to_string();
        sig.is_some_and(|sig| self.signer.verify(&poll_params(file, lang, &attempt), sig))
    }
}

fn lang_params(lang: &str) -> [(&str, &str); 1] {
    [("lang", lang)]
}

fn poll_params<'a>(file: &'a str, lang: &'a str, attempt: &'a str) -> [(&'static str, &'a str); 3] {
    [("file", file), ("lang", lang), ("attempt", attempt)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::AudioFormat;

    fn links(base: &str) -> Links {
        Links::new(base, ParamSigner::new("k")).expect("links")
    }

    fn query(url: &str) -> Vec<(String, String)> {
        Url::parse(url)
            .expect("url")
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn routes_join_under_base_path() {
        assert_eq!(
            links("https://abc.ngrok.io").set_language().unwrap(),
            "https://abc.ngrok.io/set_language"
        );
        assert_eq!(
            links("https://host/ivr").set_language().unwrap(),
            "https://host/ivr/set_language"
        );
    }

    #[test]
    fn play_link_round_trips_through_verification() {
        let l = links("https://host");
        let name = ArtifactName::generate(AudioFormat::Mp3);
        let url = l.play(&name, "hi-IN", 4).unwrap();
        let q = query(&url);
        assert_eq!(q[0], ("file".into(), name.file_name()));
        assert_eq!(q[1], ("lang".into(), "hi-IN".into()));
        assert_eq!(q[2], ("attempt".into(), "4".into()));
        let sig = q[3].1.as_str();
        assert!(l.verify_poll(&name.file_name(), "hi-IN", 4, Some(sig)));
        assert!(!l.verify_poll(&name.file_name(), "hi-IN", 0, Some(sig)));
        assert!(!l.verify_poll(&name.file_name(), "en-IN", 4, Some(sig)));
        assert!(!l.verify_poll(&name.file_name(), "hi-IN", 4, None));
    }

    #[test]
    fn lang_links_are_signed() {
        let l = links("https://host");
        let q = query(&l.ask_query("ta-IN").unwrap());
        assert!(l.verify_lang("ta-IN", Some(&q[1].1)));
        assert!(!l.verify_lang("te-IN", Some(&q[1].1)));
    }

    #[test]
    fn media_link_uses_file_name() {
        let l = links("https://host/");
        let name = ArtifactName::generate(AudioFormat::Wav);
        assert_eq!(
            l.media(&name).unwrap(),
            format!("https://host/media/{}", name.file_name())
        );
    }
}
