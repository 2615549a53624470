/// OpenSSL request config for the certificate `cn`.
///
/// A CA config carries the `v3_ca` section and is used with `req -x509`; a
/// leaf config carries `v3_req`, which is also passed to `x509 -req` when the
/// CA signs the request.
pub fn render_openssl_conf(cn: &str, is_ca: bool) -> String {
    let extensions = if is_ca {
        "x509_extensions = v3_ca\n\n\
         [ v3_ca ]\n\
         basicConstraints = critical, CA:TRUE\n\
         keyUsage = critical, keyCertSign, cRLSign\n\
         subjectKeyIdentifier = hash\n"
            .to_string()
    } else {
        format!(
            "req_extensions = v3_req\n\n\
             [ v3_req ]\n\
             basicConstraints = CA:FALSE\n\
             keyUsage = critical, digitalSignature, keyEncipherment\n\
             extendedKeyUsage = serverAuth, clientAuth\n\
             subjectAltName = DNS:{}\n",
            cn
        )
    };

    format!(
        "[ req ]\n\
         default_bits = 2048\n\
         default_md = sha256\n\
         prompt = no\n\
         distinguished_name = req_distinguished_name\n\
         {extensions}\n\
         [ req_distinguished_name ]\n\
         CN = {cn}\n",
        extensions = extensions,
        cn = cn
    )
}
